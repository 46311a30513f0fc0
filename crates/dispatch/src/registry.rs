//! Name-keyed handler registry with a default.
//!
//! One registry holds formatters, another persisters. Lookups clone the
//! handler `Arc` under a read guard, so handlers run without the lock held.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use tracing::debug;

use crate::formatter::{JsonFormatter, StringFormatter};
use crate::persister::TracingPersister;
use crate::traits::{Formatter, Handler, Persister};

/// Lookup failures. Unknown names are never silently substituted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no handler registered under '{0}'")]
    Unknown(String),

    #[error("no handler registered")]
    Empty,
}

struct Inner<H: ?Sized> {
    handlers: IndexMap<String, Arc<H>>,
    default: Option<String>,
}

/// Handlers keyed by [`Handler::name`], in registration order.
///
/// Resolution for an unspecified (absent or blank) name: the explicit default
/// if one was set, otherwise the first registered handler.
pub struct HandlerRegistry<H: ?Sized + Handler> {
    inner: RwLock<Inner<H>>,
}

impl<H: ?Sized + Handler> HandlerRegistry<H> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                handlers: IndexMap::new(),
                default: None,
            }),
        }
    }

    /// Add a handler under its name, replacing (in place) any handler
    /// registered under the same name. Returns the replaced handler.
    pub fn register(&self, handler: Arc<H>) -> Option<Arc<H>> {
        let name = handler.name().to_string();
        let previous = self
            .inner
            .write()
            .expect("registry lock poisoned")
            .handlers
            .insert(name.clone(), handler);
        debug!(handler = %name, replaced = previous.is_some(), "registered trace handler");
        previous
    }

    /// Resolve a handler.
    ///
    /// `None` or a blank name resolves to the default; an unregistered name
    /// is [`RegistryError::Unknown`].
    pub fn get(&self, name: Option<&str>) -> Result<Arc<H>, RegistryError> {
        let inner = self.inner.read().expect("registry lock poisoned");
        match specified(name) {
            Some(name) => inner
                .handlers
                .get(name)
                .cloned()
                .ok_or_else(|| RegistryError::Unknown(name.to_string())),
            None => {
                let by_default = inner
                    .default
                    .as_deref()
                    .and_then(|d| inner.handlers.get(d));
                by_default
                    .or_else(|| inner.handlers.get_index(0).map(|(_, h)| h))
                    .cloned()
                    .ok_or(RegistryError::Empty)
            }
        }
    }

    /// Designate the handler returned for unspecified names.
    ///
    /// `None` (or blank) is a no-op. An unregistered name is rejected and the
    /// prior default is kept.
    pub fn set_default(&self, name: Option<&str>) -> Result<(), RegistryError> {
        let Some(name) = specified(name) else {
            return Ok(());
        };
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if !inner.handlers.contains_key(name) {
            return Err(RegistryError::Unknown(name.to_string()));
        }
        inner.default = Some(name.to_string());
        Ok(())
    }

    /// Name of the handler an unspecified lookup currently resolves to.
    pub fn default_name(&self) -> Option<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .default
            .clone()
            .or_else(|| inner.handlers.keys().next().cloned())
    }

    pub fn names(&self) -> Vec<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("registry lock poisoned").handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<H: ?Sized + Handler> Default for HandlerRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry<dyn Formatter> {
    /// `string` (default) and `json`.
    pub fn formatters() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(StringFormatter));
        registry.register(Arc::new(JsonFormatter));
        registry
    }
}

impl HandlerRegistry<dyn Persister> {
    /// `tracing` (default).
    pub fn persisters() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(TracingPersister));
        registry
    }
}

fn specified(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}
