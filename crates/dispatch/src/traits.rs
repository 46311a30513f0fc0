//! Handler trait definitions and shared error types.

use traceable_core::LogContent;

use crate::registry::RegistryError;

/// Errors raised by formatters and persisters.
///
/// Always caught by the dispatcher; never changes an intercepted call's outcome.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("formatting failed: {0}")]
    Format(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisting failed: {0}")]
    Persist(String),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Identity shared by every registrable handler.
pub trait Handler: Send + Sync {
    /// Registry key (e.g., "json", "file"). Rules refer to handlers by it.
    fn name(&self) -> &str;
}

/// Renders a trace record to text.
pub trait Formatter: Handler {
    fn render(&self, content: &LogContent) -> Result<String, HandlerError>;
}

/// Writes rendered text to a sink.
///
/// Implementations writing to a shared sink serialize their own writes; the
/// dispatcher may call `persist` from many threads at once.
pub trait Persister: Handler {
    fn persist(&self, text: &str) -> Result<(), HandlerError>;
}
