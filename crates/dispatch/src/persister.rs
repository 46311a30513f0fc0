//! Built-in persisters.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use crate::traits::{Handler, HandlerError, Persister};

/// Emits each record as a `tracing` event on the `traceable::trace` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPersister;

impl Handler for TracingPersister {
    fn name(&self) -> &str {
        "tracing"
    }
}

impl Persister for TracingPersister {
    fn persist(&self, text: &str) -> Result<(), HandlerError> {
        info!(target: "traceable::trace", "{}", text);
        Ok(())
    }
}

/// Appends one line per record to a file.
///
/// Concurrent `persist` calls are serialized on an internal mutex so lines
/// never interleave.
pub struct FilePersister {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl FilePersister {
    /// Open (or create) `path` for appending, registered as `"file"`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HandlerError> {
        Self::named("file", path)
    }

    /// Same as [`open`](Self::open) under a custom registry name.
    pub fn named(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, HandlerError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            name: name.into(),
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Handler for FilePersister {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Persister for FilePersister {
    fn persist(&self, text: &str) -> Result<(), HandlerError> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| HandlerError::Persist(format!("{} lock poisoned", self.path.display())))?;
        writeln!(file, "{}", text)?;
        file.flush()?;
        Ok(())
    }
}

/// Keeps persisted lines in memory.
pub struct MemoryPersister {
    name: String,
    lines: Mutex<Vec<String>>,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("memory persister lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().expect("memory persister lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryPersister {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for MemoryPersister {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Persister for MemoryPersister {
    fn persist(&self, text: &str) -> Result<(), HandlerError> {
        self.lines
            .lock()
            .map_err(|_| HandlerError::Persist("memory persister lock poisoned".to_string()))?
            .push(text.to_string());
        Ok(())
    }
}
