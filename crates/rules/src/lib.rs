//! Trace rule model, matching and hot reload.
//!
//! This crate provides:
//! - Call-site patterns and first-match-wins rule matching
//! - An atomically swappable [`RuleStore`] with wait-free reads
//! - Rule storage handlers (CSV file, in-memory)
//! - A background [`RulesLoader`] driven by polling or `notify` file watching

pub mod entry;
pub mod loader;
pub mod matcher;
pub mod pattern;
pub mod rule;
pub mod storage;
pub mod store;

pub use entry::Entry;
pub use loader::{LoaderHandle, ReloadPolicy, ReloadReport, RulesLoader, StrategyRegistry};
pub use pattern::Pattern;
pub use rule::{Rule, RuleParseError, RuleRecord};
pub use storage::{CsvRulesStorage, MemoryRulesStorage, RuleStorageHandler, StorageError};
pub use store::{RuleSnapshot, RuleStore};
