//! Shared types for rule-driven call tracing.
//!
//! - [`CallSite`]: descriptor of one intercepted invocation
//! - [`CallFailure`]: the failure channel of an intercepted call
//! - [`LogContent`]: the trace record handed to formatters
//! - [`TraceConfig`]: environment-driven strategy selection

pub mod call_site;
pub mod config;
pub mod error;
pub mod log_content;

pub use call_site::{CallResult, CallSite};
pub use config::TraceConfig;
pub use error::*;
pub use log_content::{LogContent, LogKind, Severity};
