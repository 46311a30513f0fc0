//! Atomically swappable rule snapshots.
//!
//! Readers load the current [`RuleSnapshot`] with a single pointer read and
//! keep it alive for as long as they hold the `Arc`; an install publishes a
//! fresh snapshot without waiting for them.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;
use traceable_core::CallSite;

use crate::matcher;
use crate::rule::Rule;

/// Immutable, ordered view of the active rules.
#[derive(Debug, Default)]
pub struct RuleSnapshot {
    generation: u64,
    rules: Vec<Arc<Rule>>,
}

impl RuleSnapshot {
    /// Number of installs that preceded this snapshot (0 = initial).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn match_first(&self, site: &CallSite) -> Option<&Arc<Rule>> {
        matcher::match_first(&self.rules, site)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Holder of the one current snapshot.
pub struct RuleStore {
    current: ArcSwap<RuleSnapshot>,
}

impl RuleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RuleSnapshot::default()),
        }
    }

    /// Create a store whose initial snapshot holds `rules`.
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            current: ArcSwap::from_pointee(RuleSnapshot {
                generation: 0,
                rules: rules.into_iter().map(Arc::new).collect(),
            }),
        }
    }

    pub fn current(&self) -> Arc<RuleSnapshot> {
        self.current.load_full()
    }

    /// Replace the visible rule sequence in one publish. Returns the new
    /// snapshot's generation.
    pub fn install(&self, rules: Vec<Rule>) -> u64 {
        let rules: Vec<Arc<Rule>> = rules.into_iter().map(Arc::new).collect();
        let previous = self.current.rcu(|old| RuleSnapshot {
            generation: old.generation + 1,
            rules: rules.clone(),
        });
        let generation = previous.generation + 1;
        debug!(generation, count = rules.len(), "installed rule snapshot");
        generation
    }

    /// First rule of the current snapshot matching `site`.
    pub fn match_first(&self, site: &CallSite) -> Option<Arc<Rule>> {
        let snapshot = self.current.load();
        snapshot.match_first(site).cloned()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::rule::RuleRecord;

    fn owner_rules(owner: &str, count: usize) -> Vec<Rule> {
        (0..count)
            .map(|i| Rule::parse(&RuleRecord::new(format!("{owner}.m{i}"), Entry::Before)).unwrap())
            .collect()
    }

    #[test]
    fn install_replaces_whole_sequence() {
        let store = RuleStore::with_rules(owner_rules("A", 3));
        assert_eq!(store.len(), 3);
        assert_eq!(store.current().generation(), 0);

        let generation = store.install(owner_rules("B", 1));
        assert_eq!(generation, 1);
        assert_eq!(store.len(), 1);
        assert!(store.match_first(&CallSite::new("A", "m0")).is_none());
        assert!(store.match_first(&CallSite::new("B", "m0")).is_some());
    }

    #[test]
    fn held_snapshot_survives_install() {
        let store = RuleStore::with_rules(owner_rules("A", 2));
        let before = store.current();
        store.install(Vec::new());
        assert_eq!(before.len(), 2);
        assert!(before.match_first(&CallSite::new("A", "m1")).is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_readers_never_see_mixed_snapshots() {
        let store = RuleStore::with_rules(owner_rules("A", 64));
        let a = owner_rules("A", 64);
        let b = owner_rules("B", 32);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..500 {
                    let next = if i % 2 == 0 { b.clone() } else { a.clone() };
                    store.install(next);
                }
            });

            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..2_000 {
                        let snapshot = store.current();
                        let first = snapshot.rules()[0].pattern.owner().clone();
                        let expected_len = match &first {
                            crate::pattern::Segment::Exact(o) if o == "A" => 64,
                            _ => 32,
                        };
                        assert_eq!(snapshot.len(), expected_len);
                        assert!(snapshot
                            .rules()
                            .iter()
                            .all(|rule| rule.pattern.owner() == &first));
                    }
                });
            }
        });

        assert_eq!(store.current().generation(), 500);
    }
}
