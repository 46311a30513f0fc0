//! Trace records built by the dispatcher and handed to formatters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::call_site::{CallResult, CallSite};

/// Which advice produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogKind {
    TraceBefore,
    TraceAfter,
    TraceAround,
    TraceAfterThrowing,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::TraceBefore => write!(f, "TRACE_BEFORE"),
            LogKind::TraceAfter => write!(f, "TRACE_AFTER"),
            LogKind::TraceAround => write!(f, "TRACE_AROUND"),
            LogKind::TraceAfterThrowing => write!(f, "TRACE_AFTER_THROWING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Calls that completed, and records with no outcome yet.
    Info,
    /// Calls that failed.
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single trace event. Passed by reference to formatters, never retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogContent {
    pub kind: LogKind,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub payload: Value,
}

impl LogContent {
    pub fn new(kind: LogKind, severity: Severity, payload: Value) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            severity,
            payload,
        }
    }

    /// Build the record for a call-site, with its outcome once the call ran.
    ///
    /// A failed outcome raises the severity to [`Severity::Error`] and is
    /// rendered under `error`; a successful one under `result`.
    pub fn for_call(kind: LogKind, site: &CallSite, outcome: Option<&CallResult>) -> Self {
        let mut payload = json!({
            "owner": site.owner,
            "method": site.method,
            "parameter_types": site.parameter_types,
            "args": site.args,
        });

        let mut severity = Severity::Info;
        if let (Some(outcome), Some(map)) = (outcome, payload.as_object_mut()) {
            match outcome {
                Ok(value) => {
                    map.insert("result".to_string(), value.clone());
                }
                Err(failure) => {
                    severity = Severity::Error;
                    map.insert("error".to_string(), Value::String(failure.to_string()));
                }
            }
        }

        Self::new(kind, severity, payload)
    }
}
