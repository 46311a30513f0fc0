//! Startup-time selection of reload policy and storage by configuration key.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{info, warn};
use traceable_core::config::{DEFAULT_LOADER, DEFAULT_STORAGE};
use traceable_core::{ConfigError, TraceConfig};

use crate::storage::{CsvRulesStorage, MemoryRulesStorage, RuleStorageHandler};
use crate::store::RuleStore;

use super::core::{ReloadPolicy, RulesLoader};

/// Builds a reload policy from configuration.
pub type PolicyFactory = fn(&TraceConfig) -> ReloadPolicy;

/// Builds a storage handler from configuration.
pub type StorageFactory = fn(&TraceConfig) -> Arc<dyn RuleStorageHandler>;

/// Maps configuration keys to constructors.
///
/// Resolved once when the loader is built. Unknown keys are reported as
/// [`ConfigError`] and replaced by the built-in default pairing
/// (`file-watcher` + `csv`).
pub struct StrategyRegistry {
    loaders: IndexMap<String, PolicyFactory>,
    storages: IndexMap<String, StorageFactory>,
}

impl StrategyRegistry {
    /// Registry with no entries.
    pub fn empty() -> Self {
        Self {
            loaders: IndexMap::new(),
            storages: IndexMap::new(),
        }
    }

    /// Registry with the built-in strategies.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register_loader("file-watcher", |c| ReloadPolicy::Watch {
            debounce: c.debounce,
        });
        registry.register_loader("polling", |c| ReloadPolicy::Poll(c.poll_interval));
        registry.register_storage("csv", |c| -> Arc<dyn RuleStorageHandler> {
            Arc::new(CsvRulesStorage::new(c.rules_path.clone()))
        });
        registry.register_storage("memory", |_| -> Arc<dyn RuleStorageHandler> {
            Arc::new(MemoryRulesStorage::default())
        });
        registry
    }

    /// Add or replace a loader strategy.
    pub fn register_loader(&mut self, key: impl Into<String>, factory: PolicyFactory) {
        self.loaders.insert(normalize(&key.into()), factory);
    }

    /// Add or replace a storage strategy.
    pub fn register_storage(&mut self, key: impl Into<String>, factory: StorageFactory) {
        self.storages.insert(normalize(&key.into()), factory);
    }

    pub fn loader_keys(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    pub fn storage_keys(&self) -> impl Iterator<Item = &str> {
        self.storages.keys().map(String::as_str)
    }

    pub fn resolve_policy(&self, config: &TraceConfig) -> Result<ReloadPolicy, ConfigError> {
        self.loaders
            .get(&normalize(&config.loader_class))
            .map(|factory| factory(config))
            .ok_or_else(|| ConfigError::UnknownLoader(config.loader_class.clone()))
    }

    pub fn resolve_storage(
        &self,
        config: &TraceConfig,
    ) -> Result<Arc<dyn RuleStorageHandler>, ConfigError> {
        self.storages
            .get(&normalize(&config.storage_handler_class))
            .map(|factory| factory(config))
            .ok_or_else(|| ConfigError::UnknownStorage(config.storage_handler_class.clone()))
    }

    /// Build a loader for `store`, falling back to the default strategy for
    /// any key that does not resolve.
    pub fn build(&self, config: &TraceConfig, store: Arc<RuleStore>) -> RulesLoader {
        let policy = self.resolve_policy(config).unwrap_or_else(|e| {
            warn!(error = %e, fallback = DEFAULT_LOADER, "invalid loader configuration");
            default_policy(config)
        });

        let storage = self.resolve_storage(config).unwrap_or_else(|e| {
            warn!(error = %e, fallback = DEFAULT_STORAGE, "invalid storage configuration");
            let fallback: Arc<dyn RuleStorageHandler> =
                Arc::new(CsvRulesStorage::new(config.rules_path.clone()));
            fallback
        });

        info!(storage = storage.name(), policy = ?policy, "resolved rules loader strategy");
        RulesLoader::new(storage, store, policy)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn default_policy(config: &TraceConfig) -> ReloadPolicy {
    ReloadPolicy::Watch {
        debounce: config.debounce,
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}
