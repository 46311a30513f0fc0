//! Error types and reload reports for the rule loader.

use crate::rule::RuleParseError;
use crate::storage::StorageError;

/// Errors that can occur while loading rules or starting the loader.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The whole source could not be read; the previous snapshot is kept.
    #[error("rule source unavailable: {0}")]
    Source(#[from] StorageError),

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for loader operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// A record left out of the installed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Position of the record in the source.
    pub index: usize,
    pub pattern: String,
    pub error: RuleParseError,
}

/// Outcome of one reload cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    /// Generation of the installed snapshot, or `None` when the previous
    /// snapshot was kept because no record parsed.
    pub generation: Option<u64>,
    /// Number of rules in the installed snapshot.
    pub installed: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl ReloadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}
