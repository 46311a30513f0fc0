//! Persistent sources of raw rule records.
//!
//! A [`RuleStorageHandler`] only moves [`RuleRecord`]s in and out of a medium;
//! parsing into rules happens in the loader.

mod csv;
mod memory;

use std::path::Path;

pub use self::csv::CsvRulesStorage;
pub use self::memory::MemoryRulesStorage;

use crate::rule::RuleRecord;

/// The rule source could not be read or written as a whole.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The source refused to serve records.
    #[error("rule source unavailable: {0}")]
    Unavailable(String),

    /// A record cannot be represented in the medium.
    #[error("cannot persist record '{pattern}': {reason}")]
    Unrepresentable { pattern: String, reason: String },
}

/// Loads and persists the raw rule set.
pub trait RuleStorageHandler: Send + Sync {
    /// Fetch every record, in rule order.
    fn load(&self) -> Result<Vec<RuleRecord>, StorageError>;

    /// Replace the persisted rule set.
    fn save(&self, records: &[RuleRecord]) -> Result<(), StorageError>;

    /// File whose modification should trigger a reload, if any.
    fn watch_path(&self) -> Option<&Path> {
        None
    }

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}
