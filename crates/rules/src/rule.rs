//! Raw rule records and their parsed form.

use serde::{Deserialize, Serialize};
use traceable_core::CallSite;

use crate::entry::Entry;
use crate::pattern::{Pattern, PatternError};

/// Rule as persisted by a storage handler.
///
/// Handler identities are optional; `None` (or blank) selects the registry
/// default at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub pattern: String,
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persister: Option<String>,
    /// Fields the medium held beyond the four known ones. A record with
    /// any fails to parse.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl RuleRecord {
    pub fn new(pattern: impl Into<String>, entry: Entry) -> Self {
        Self {
            pattern: pattern.into(),
            entry: entry.to_string(),
            formatter: None,
            persister: None,
            extra: Vec::new(),
        }
    }

    pub fn with_formatter(mut self, name: impl Into<String>) -> Self {
        self.formatter = Some(name.into());
        self
    }

    pub fn with_persister(mut self, name: impl Into<String>) -> Self {
        self.persister = Some(name.into());
        self
    }
}

/// A single record that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleParseError {
    #[error("invalid pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("invalid entry: {0}")]
    Entry(String),

    #[error("missing entry")]
    MissingEntry,

    #[error("unexpected trailing fields: {}", .0.join(", "))]
    TrailingFields(Vec<String>),
}

/// Parsed, immutable rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: Pattern,
    pub entry: Entry,
    pub formatter: Option<String>,
    pub persister: Option<String>,
}

impl Rule {
    pub fn parse(record: &RuleRecord) -> Result<Self, RuleParseError> {
        if !record.extra.is_empty() {
            return Err(RuleParseError::TrailingFields(record.extra.clone()));
        }
        if record.entry.trim().is_empty() {
            return Err(RuleParseError::MissingEntry);
        }
        let pattern = Pattern::parse(&record.pattern)?;
        let entry = record
            .entry
            .parse::<Entry>()
            .map_err(RuleParseError::Entry)?;
        Ok(Self {
            pattern,
            entry,
            formatter: normalize_identity(record.formatter.as_deref()),
            persister: normalize_identity(record.persister.as_deref()),
        })
    }

    pub fn matches(&self, site: &CallSite) -> bool {
        self.pattern
            .matches(&site.owner, &site.method, &site.parameter_types)
    }

    /// Back to the persisted form.
    pub fn to_record(&self) -> RuleRecord {
        RuleRecord {
            pattern: self.pattern.to_string(),
            entry: self.entry.to_string(),
            formatter: self.formatter.clone(),
            persister: self.persister.clone(),
            extra: Vec::new(),
        }
    }
}

fn normalize_identity(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
