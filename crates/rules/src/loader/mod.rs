//! Background rule reloading.
//!
//! A [`RulesLoader`] pulls records from a [`RuleStorageHandler`](crate::storage::RuleStorageHandler),
//! parses them and installs the well-formed subset into a shared
//! [`RuleStore`](crate::store::RuleStore). It runs as a tokio task driven
//! either by a fixed poll interval or by filesystem change notifications.

mod core;
mod error;
mod strategy;
mod watcher;

#[cfg(test)]
mod tests;

pub use self::core::{reload_cycle, LoaderHandle, ReloadPolicy, RulesLoader};
pub use self::error::{ReloadReport, Result, RuleError, SkippedRecord};
pub use self::strategy::{PolicyFactory, StorageFactory, StrategyRegistry};
