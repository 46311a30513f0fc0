//! First-match-wins lookup over an ordered rule sequence.

use std::sync::Arc;

use traceable_core::CallSite;

use crate::rule::Rule;

/// Return the earliest rule matching the call-site, or `None`.
///
/// Later matching rules are ignored; there is no specificity ranking.
pub fn match_first<'a>(rules: &'a [Arc<Rule>], site: &CallSite) -> Option<&'a Arc<Rule>> {
    rules.iter().find(|rule| rule.matches(site))
}
