//! Advice entry point of a rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// When a trace record is produced relative to the intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Entry {
    Before,
    After,
    Around,
    AfterThrowing,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Before => write!(f, "BEFORE"),
            Entry::After => write!(f, "AFTER"),
            Entry::Around => write!(f, "AROUND"),
            Entry::AfterThrowing => write!(f, "AFTER_THROWING"),
        }
    }
}

impl FromStr for Entry {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BEFORE" => Ok(Entry::Before),
            "AFTER" => Ok(Entry::After),
            "AROUND" => Ok(Entry::Around),
            "AFTER_THROWING" => Ok(Entry::AfterThrowing),
            _ => Err(format!("unknown entry: '{}'", s)),
        }
    }
}
