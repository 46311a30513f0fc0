//! In-process rule storage.

use std::sync::Mutex;

use super::{RuleStorageHandler, StorageError};
use crate::rule::RuleRecord;

#[derive(Default)]
struct State {
    records: Vec<RuleRecord>,
    failure: Option<String>,
    loads: usize,
}

/// Keeps records in memory. Can be switched into a failing state to
/// exercise reload resilience.
#[derive(Default)]
pub struct MemoryRulesStorage {
    state: Mutex<State>,
}

impl MemoryRulesStorage {
    pub fn new(records: Vec<RuleRecord>) -> Self {
        Self {
            state: Mutex::new(State {
                records,
                ..State::default()
            }),
        }
    }

    pub fn set_records(&self, records: Vec<RuleRecord>) {
        self.state.lock().expect("memory storage lock poisoned").records = records;
    }

    /// Make every subsequent `load` fail with `reason` until [`recover`](Self::recover).
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.state.lock().expect("memory storage lock poisoned").failure = Some(reason.into());
    }

    pub fn recover(&self) {
        self.state.lock().expect("memory storage lock poisoned").failure = None;
    }

    /// Number of `load` calls so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.state.lock().expect("memory storage lock poisoned").loads
    }
}

impl RuleStorageHandler for MemoryRulesStorage {
    fn load(&self) -> Result<Vec<RuleRecord>, StorageError> {
        let mut state = self.state.lock().expect("memory storage lock poisoned");
        state.loads += 1;
        match &state.failure {
            Some(reason) => Err(StorageError::Unavailable(reason.clone())),
            None => Ok(state.records.clone()),
        }
    }

    fn save(&self, records: &[RuleRecord]) -> Result<(), StorageError> {
        self.set_records(records.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
