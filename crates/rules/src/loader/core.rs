//! Core [`RulesLoader`]: reload cycle and the background task around it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::rule::Rule;
use crate::storage::RuleStorageHandler;
use crate::store::RuleStore;

use super::error::{ReloadReport, Result, RuleError, SkippedRecord};
use super::watcher::spawn_watcher;

/// When the background task reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadPolicy {
    /// Reload every interval.
    Poll(Duration),
    /// Reload when the storage's watch path changes; bursts of events
    /// within `debounce` collapse into one reload.
    Watch { debounce: Duration },
}

/// Fetch, parse and install one generation of rules.
///
/// Malformed records are skipped and reported. A failing source leaves the
/// current snapshot untouched. When the source returned records but none of
/// them parsed, the current snapshot is also kept.
pub fn reload_cycle(storage: &dyn RuleStorageHandler, store: &RuleStore) -> Result<ReloadReport> {
    let records = storage.load()?;
    let total = records.len();

    let mut rules = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for (index, record) in records.iter().enumerate() {
        match Rule::parse(record) {
            Ok(rule) => rules.push(rule),
            Err(error) => {
                warn!(
                    storage = storage.name(),
                    index,
                    pattern = %record.pattern,
                    error = %error,
                    "skipping malformed rule record"
                );
                skipped.push(SkippedRecord {
                    index,
                    pattern: record.pattern.clone(),
                    error,
                });
            }
        }
    }

    if rules.is_empty() && total > 0 {
        warn!(
            storage = storage.name(),
            skipped = skipped.len(),
            "no rule record parsed, keeping previous snapshot"
        );
        return Ok(ReloadReport {
            generation: None,
            installed: 0,
            skipped,
        });
    }

    let installed = rules.len();
    let generation = store.install(rules);
    info!(
        storage = storage.name(),
        generation,
        installed,
        skipped = skipped.len(),
        "installed rule snapshot"
    );

    Ok(ReloadReport {
        generation: Some(generation),
        installed,
        skipped,
    })
}

/// Keeps a [`RuleStore`] fresh from a storage handler.
pub struct RulesLoader {
    storage: Arc<dyn RuleStorageHandler>,
    store: Arc<RuleStore>,
    policy: ReloadPolicy,
}

impl RulesLoader {
    pub fn new(
        storage: Arc<dyn RuleStorageHandler>,
        store: Arc<RuleStore>,
        policy: ReloadPolicy,
    ) -> Self {
        Self {
            storage,
            store,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn storage(&self) -> &Arc<dyn RuleStorageHandler> {
        &self.storage
    }

    pub fn policy(&self) -> ReloadPolicy {
        self.policy
    }

    /// Run one reload cycle on the calling thread.
    pub fn reload_now(&self) -> Result<ReloadReport> {
        reload_cycle(self.storage.as_ref(), &self.store)
    }

    /// Start the background task. Must be called inside a tokio runtime.
    ///
    /// The task performs an initial reload, then one per poll tick or
    /// change notification, until [`LoaderHandle::stop`] is called.
    pub fn spawn(self) -> Result<LoaderHandle> {
        let (tx, rx) = mpsc::channel(1);
        let shutdown = Arc::new(Notify::new());

        let (ticker, debounce, watcher) = match self.policy {
            ReloadPolicy::Poll(interval) => {
                let interval = interval.max(Duration::from_millis(1));
                let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                (Some(ticker), Duration::ZERO, None)
            }
            ReloadPolicy::Watch { debounce } => match self.storage.watch_path() {
                Some(path) => (None, debounce, Some(spawn_watcher(path, tx.clone())?)),
                None => {
                    warn!(
                        storage = self.storage.name(),
                        "storage has no watch path, reloading on explicit trigger only"
                    );
                    (None, debounce, None)
                }
            },
        };

        info!(storage = self.storage.name(), policy = ?self.policy, "starting rules loader");

        let store = Arc::clone(&self.store);
        let task = tokio::spawn(run_loop(
            self.storage,
            Arc::clone(&store),
            ticker,
            debounce,
            rx,
            Arc::clone(&shutdown),
            watcher,
        ));

        Ok(LoaderHandle {
            shutdown,
            signals: tx,
            task: Some(task),
            store,
        })
    }
}

/// Control handle of a running loader task.
///
/// Dropping the handle also asks the task to stop, without waiting for it.
pub struct LoaderHandle {
    shutdown: Arc<Notify>,
    signals: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
    store: Arc<RuleStore>,
}

impl LoaderHandle {
    /// Request an immediate reload. Coalesces with a pending request.
    pub fn trigger(&self) {
        let _ = self.signals.try_send(());
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop issuing reloads and wait for the task to exit. A reload already
    /// in progress completes first; the watcher is released with the task.
    pub async fn stop(mut self) {
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "rules loader task failed");
            }
        }
        info!("rules loader stopped");
    }
}

impl Drop for LoaderHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.shutdown.notify_one();
        }
    }
}

async fn run_loop(
    storage: Arc<dyn RuleStorageHandler>,
    store: Arc<RuleStore>,
    mut ticker: Option<Interval>,
    debounce: Duration,
    mut signals: mpsc::Receiver<()>,
    shutdown: Arc<Notify>,
    _watcher: Option<notify::RecommendedWatcher>,
) {
    run_cycle(&storage, &store).await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            _ = next_tick(&mut ticker) => {}
            Some(()) = signals.recv() => {
                if !debounce.is_zero() {
                    tokio::select! {
                        biased;
                        _ = shutdown.notified() => break,
                        _ = tokio::time::sleep(debounce) => {}
                    }
                }
                while signals.try_recv().is_ok() {}
                debug!("reload signalled");
            }
        }

        run_cycle(&storage, &store).await;
    }

    debug!("rules loader loop exited");
}

/// One cycle on the blocking pool; shutdown is only observed between cycles.
async fn run_cycle(storage: &Arc<dyn RuleStorageHandler>, store: &Arc<RuleStore>) {
    let storage = Arc::clone(storage);
    let store = Arc::clone(store);
    let outcome = tokio::task::spawn_blocking(move || reload_cycle(storage.as_ref(), &store)).await;

    match outcome {
        Ok(Ok(_)) => {}
        Ok(Err(e @ RuleError::Source(_))) => {
            warn!(error = %e, "reload failed, keeping previous snapshot");
        }
        Ok(Err(e)) => warn!(error = %e, "reload failed"),
        Err(e) => error!(error = %e, "reload cycle panicked"),
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
