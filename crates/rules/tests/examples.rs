//! Integration tests over the sample rule file in `data/`.

use traceable_core::CallSite;
use traceable_rules::loader::reload_cycle;
use traceable_rules::{CsvRulesStorage, Entry, RuleStorageHandler, RuleStore};

/// Integration tests run from the crate directory, so we go up two levels.
fn example_path() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/trace-rules.example.csv")
}

fn load_store() -> RuleStore {
    let storage = CsvRulesStorage::new(example_path());
    let store = RuleStore::new();
    let report = reload_cycle(&storage, &store)
        .unwrap_or_else(|e| panic!("Failed to load {}: {}", example_path().display(), e));
    assert!(report.is_clean(), "skipped: {:?}", report.skipped);
    store
}

#[test]
fn example_file_parses_cleanly() {
    let records = CsvRulesStorage::new(example_path()).load().unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].pattern, "Svc.compute(i32,i32)");
    assert_eq!(records[0].formatter.as_deref(), Some("json"));
    assert_eq!(records[0].persister, None);
    assert_eq!(records[2].persister.as_deref(), Some("tracing"));

    let store = load_store();
    assert_eq!(store.len(), 5);
    assert_eq!(store.current().generation(), 1);
}

#[test]
fn example_rules_resolve_in_order() {
    let store = load_store();
    let entry = |site: CallSite| store.match_first(&site).map(|rule| rule.entry);

    let compute = CallSite::new("Svc", "compute")
        .with_arg("i32", 2)
        .with_arg("i32", 3);
    assert_eq!(entry(compute), Some(Entry::Around));

    let widened = CallSite::new("Svc", "compute").with_arg("i64", 2);
    assert_eq!(entry(widened), Some(Entry::Before));

    let save = CallSite::new("Repo", "save").with_arg("Order", "o-1");
    assert_eq!(entry(save), Some(Entry::AfterThrowing));

    assert_eq!(entry(CallSite::new("Repo", "find")), Some(Entry::After));
    assert_eq!(
        entry(CallSite::new("Repo", "find").with_arg("u64", 7)),
        None
    );
    assert_eq!(entry(CallSite::new("Gateway", "healthCheck")), Some(Entry::Around));
    assert_eq!(entry(CallSite::new("Gateway", "send")), None);
}
