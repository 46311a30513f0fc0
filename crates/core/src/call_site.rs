//! Descriptor of a single intercepted invocation.

use serde::Serialize;
use serde_json::Value;

use crate::error::CallFailure;

/// Outcome channel of an intercepted call.
pub type CallResult = Result<Value, CallFailure>;

/// Owner, method, parameter types and argument values of one call.
///
/// Built by the interception point, moved into the dispatcher and dropped
/// when the dispatch returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSite {
    pub owner: String,
    pub method: String,
    pub parameter_types: Vec<String>,
    pub args: Vec<Value>,
}

impl CallSite {
    pub fn new(owner: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            parameter_types: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Append one typed argument.
    pub fn with_arg(mut self, parameter_type: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameter_types.push(parameter_type.into());
        self.args.push(value.into());
        self
    }

    /// `Owner.method(T1,T2)` form used in log payloads and diagnostics.
    pub fn signature(&self) -> String {
        format!(
            "{}.{}({})",
            self.owner,
            self.method,
            self.parameter_types.join(",")
        )
    }
}
