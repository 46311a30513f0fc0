//! Tests for the rule loader module.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use traceable_core::{CallSite, ConfigError, TraceConfig};

use super::*;
use crate::entry::Entry;
use crate::rule::{RuleParseError, RuleRecord};
use crate::storage::{CsvRulesStorage, MemoryRulesStorage, RuleStorageHandler};
use crate::store::RuleStore;

fn records() -> Vec<RuleRecord> {
    vec![
        RuleRecord::new("Svc.*", Entry::Before).with_formatter("json"),
        RuleRecord::new("Repo.save", Entry::AfterThrowing),
    ]
}

fn malformed() -> RuleRecord {
    RuleRecord {
        pattern: "no-method".to_string(),
        entry: "BEFORE".to_string(),
        formatter: None,
        persister: None,
        extra: Vec::new(),
    }
}

fn memory_loader(policy: ReloadPolicy) -> (Arc<MemoryRulesStorage>, RulesLoader) {
    let storage = Arc::new(MemoryRulesStorage::new(records()));
    let loader = RulesLoader::new(
        Arc::clone(&storage) as Arc<dyn RuleStorageHandler>,
        Arc::new(RuleStore::new()),
        policy,
    );
    (storage, loader)
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ── reload cycle ────────────────────────────────────────────────────

#[test]
fn reload_installs_all_records_in_order() {
    let (_storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_secs(60)));
    let report = loader.reload_now().unwrap();

    assert_eq!(report.generation, Some(1));
    assert_eq!(report.installed, 2);
    assert!(report.is_clean());

    let snapshot = loader.store().current();
    assert_eq!(snapshot.rules()[0].pattern.as_str(), "Svc.*");
    assert_eq!(snapshot.rules()[1].entry, Entry::AfterThrowing);
}

#[test]
fn malformed_records_are_skipped_and_reported() {
    let (storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_secs(60)));
    let mut mixed = records();
    mixed.insert(1, malformed());
    storage.set_records(mixed);

    let report = loader.reload_now().unwrap();
    assert_eq!(report.installed, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 1);
    assert_eq!(report.skipped[0].pattern, "no-method");
    assert!(matches!(report.skipped[0].error, RuleParseError::Pattern(_)));
    assert_eq!(loader.store().len(), 2);
}

#[test]
fn failing_source_keeps_previous_snapshot() {
    let (storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_secs(60)));
    loader.reload_now().unwrap();
    let before = loader.store().current();

    storage.fail_with("backend offline");
    let err = loader.reload_now().unwrap_err();
    assert!(matches!(err, RuleError::Source(_)));

    let after = loader.store().current();
    assert_eq!(after.generation(), before.generation());
    assert_eq!(after.len(), 2);
    assert!(loader
        .store()
        .match_first(&CallSite::new("Svc", "compute"))
        .is_some());
}

#[test]
fn wholly_malformed_source_keeps_previous_snapshot() {
    let (storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_secs(60)));
    loader.reload_now().unwrap();

    storage.set_records(vec![malformed(), malformed()]);
    let report = loader.reload_now().unwrap();
    assert_eq!(report.generation, None);
    assert_eq!(report.skipped.len(), 2);
    assert_eq!(loader.store().len(), 2);
}

#[test]
fn empty_source_installs_empty_snapshot() {
    let (storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_secs(60)));
    loader.reload_now().unwrap();

    storage.set_records(Vec::new());
    let report = loader.reload_now().unwrap();
    assert_eq!(report.generation, Some(2));
    assert!(loader.store().is_empty());
}

#[test]
fn csv_rows_with_wrong_field_count_keep_previous_snapshot() {
    let dir = TempDir::new().expect("create tempdir");
    let path = dir.path().join("rules.csv");
    let storage = CsvRulesStorage::new(&path);
    let store = RuleStore::new();

    fs::write(&path, "Svc.*,BEFORE\nRepo.*,AFTER\n").unwrap();
    reload_cycle(&storage, &store).unwrap();
    assert_eq!(store.len(), 2);

    fs::write(&path, "Svc.*\nRepo.*,AFTER,a,b,c\n").unwrap();
    let report = reload_cycle(&storage, &store).unwrap();
    assert_eq!(report.generation, None);
    assert_eq!(report.skipped.len(), 2);
    assert!(!report.is_clean());
    assert_eq!(report.skipped[0].error, RuleParseError::MissingEntry);
    assert!(matches!(report.skipped[1].error, RuleParseError::TrailingFields(_)));
    assert_eq!(store.len(), 2);
    assert_eq!(store.current().generation(), 1);
}

#[test]
fn csv_row_with_extra_fields_is_reported_not_dropped() {
    let dir = TempDir::new().expect("create tempdir");
    let path = dir.path().join("rules.csv");
    fs::write(&path, "Svc.*,BEFORE\nRepo.*,AFTER,a,b,c\n").unwrap();

    let store = RuleStore::new();
    let report = reload_cycle(&CsvRulesStorage::new(&path), &store).unwrap();
    assert_eq!(report.installed, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 1);
    assert_eq!(report.skipped[0].pattern, "Repo.*");
    assert!(!report.is_clean());
}

// ── background task ─────────────────────────────────────────────────

#[tokio::test]
async fn polling_loader_picks_up_changes() {
    let (storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_millis(20)));
    let handle = loader.spawn().unwrap();
    let store = Arc::clone(handle.store());

    assert!(wait_until(|| store.len() == 2).await);

    storage.set_records(vec![RuleRecord::new("*", Entry::Around)]);
    assert!(wait_until(|| store.len() == 1).await);
    assert_eq!(store.current().rules()[0].entry, Entry::Around);

    handle.stop().await;
}

#[tokio::test]
async fn polling_survives_a_failing_cycle() {
    let (storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_millis(20)));
    let handle = loader.spawn().unwrap();
    let store = Arc::clone(handle.store());
    assert!(wait_until(|| store.len() == 2).await);

    storage.fail_with("flaky");
    let failed_from = storage.load_count();
    assert!(wait_until(|| storage.load_count() > failed_from + 2).await);
    assert_eq!(store.len(), 2);

    storage.recover();
    storage.set_records(vec![RuleRecord::new("Other.*", Entry::After)]);
    assert!(wait_until(|| store.len() == 1).await);

    handle.stop().await;
}

#[tokio::test]
async fn stop_ends_reloading() {
    let (storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_millis(10)));
    let handle = loader.spawn().unwrap();
    assert!(wait_until(|| storage.load_count() >= 2).await);

    handle.stop().await;
    let settled = storage.load_count();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(storage.load_count(), settled);
}

#[tokio::test]
async fn dropping_the_handle_ends_reloading() {
    let (storage, loader) = memory_loader(ReloadPolicy::Poll(Duration::from_millis(10)));
    let handle = loader.spawn().unwrap();
    assert!(wait_until(|| storage.load_count() >= 2).await);

    drop(handle);
    // Let a cycle already past the shutdown check finish.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = storage.load_count();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(storage.load_count(), settled);
}

#[tokio::test]
async fn trigger_reloads_without_watch_path() {
    let (storage, loader) = memory_loader(ReloadPolicy::Watch {
        debounce: Duration::from_millis(5),
    });
    let handle = loader.spawn().unwrap();
    let store = Arc::clone(handle.store());
    assert!(wait_until(|| store.len() == 2).await);

    storage.set_records(vec![RuleRecord::new("Svc.run", Entry::After)]);
    handle.trigger();
    assert!(wait_until(|| store.len() == 1).await);

    handle.stop().await;
}

#[tokio::test]
async fn file_watcher_reloads_on_write() {
    let dir = TempDir::new().expect("create tempdir");
    let path = dir.path().join("rules.csv");
    fs::write(&path, "Svc.*,BEFORE\n").unwrap();

    let config = TraceConfig {
        rules_path: path.clone(),
        debounce: Duration::from_millis(20),
        ..TraceConfig::default()
    };
    let loader = StrategyRegistry::builtin().build(&config, Arc::new(RuleStore::new()));
    assert!(matches!(loader.policy(), ReloadPolicy::Watch { .. }));

    let handle = loader.spawn().unwrap();
    let store = Arc::clone(handle.store());
    assert!(wait_until(|| store.len() == 1).await);

    fs::write(&path, "Svc.*,BEFORE\nRepo.*,AFTER\n").unwrap();
    assert!(wait_until(|| store.len() == 2).await);

    handle.stop().await;
}

// ── strategy registry ───────────────────────────────────────────────

#[test]
fn builtin_keys_resolve() {
    let registry = StrategyRegistry::builtin();
    let config = TraceConfig {
        loader_class: "Polling".to_string(),
        storage_handler_class: "memory".to_string(),
        poll_interval: Duration::from_millis(50),
        ..TraceConfig::default()
    };

    assert_eq!(
        registry.resolve_policy(&config).unwrap(),
        ReloadPolicy::Poll(Duration::from_millis(50))
    );
    assert_eq!(registry.resolve_storage(&config).unwrap().name(), "memory");
    assert_eq!(
        registry.loader_keys().collect::<Vec<_>>(),
        vec!["file-watcher", "polling"]
    );
}

#[test]
fn unknown_keys_fall_back_to_default_pairing() {
    let registry = StrategyRegistry::builtin();
    let config = TraceConfig {
        loader_class: "com.example.MagicLoader".to_string(),
        storage_handler_class: "ldap".to_string(),
        rules_path: PathBuf::from("fallback.csv"),
        ..TraceConfig::default()
    };

    assert_eq!(
        registry.resolve_policy(&config).unwrap_err(),
        ConfigError::UnknownLoader("com.example.MagicLoader".to_string())
    );
    assert!(matches!(
        registry.resolve_storage(&config),
        Err(ConfigError::UnknownStorage(_))
    ));

    let loader = registry.build(&config, Arc::new(RuleStore::new()));
    assert_eq!(
        loader.policy(),
        ReloadPolicy::Watch {
            debounce: config.debounce
        }
    );
    assert_eq!(loader.storage().name(), "csv");
    assert_eq!(
        loader.storage().watch_path(),
        Some(std::path::Path::new("fallback.csv"))
    );
}

#[test]
fn custom_strategy_can_be_registered() {
    let mut registry = StrategyRegistry::empty();
    registry.register_loader("every-second", |_| ReloadPolicy::Poll(Duration::from_secs(1)));
    let config = TraceConfig {
        loader_class: "every-second".to_string(),
        ..TraceConfig::default()
    };
    assert_eq!(
        registry.resolve_policy(&config).unwrap(),
        ReloadPolicy::Poll(Duration::from_secs(1))
    );
}
