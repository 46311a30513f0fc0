//! Advice dispatch for traced calls.
//!
//! This crate provides:
//! - `Formatter` / `Persister` traits for pluggable trace handlers
//! - String and JSON formatters; tracing, file and in-memory persisters
//! - `HandlerRegistry` with default-handler fallback
//! - `Dispatcher` that runs BEFORE / AFTER / AROUND / AFTER_THROWING advice
//!   around an explicit proceed capability

pub mod around;
pub mod dispatcher;
pub mod formatter;
pub mod persister;
pub mod registry;
pub mod traits;

pub use around::{AroundAdvice, Proceed, TraceSink, TracingAround};
pub use dispatcher::Dispatcher;
pub use formatter::{JsonFormatter, StringFormatter};
pub use persister::{FilePersister, MemoryPersister, TracingPersister};
pub use registry::{HandlerRegistry, RegistryError};
pub use traits::{Formatter, Handler, HandlerError, Persister};
