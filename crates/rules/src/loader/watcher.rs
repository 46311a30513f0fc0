//! Filesystem change notifications for the watch reload policy.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::Result;

/// Watch the directory containing `path` and signal `tx` whenever the file
/// itself is created, written, renamed into place or removed.
///
/// The parent directory is watched rather than the file so that atomic
/// tmp-then-rename replacements are observed.
pub(super) fn spawn_watcher(path: &Path, tx: mpsc::Sender<()>) -> Result<RecommendedWatcher> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let target = path.file_name().map(|n| n.to_os_string());

    let mut watcher = notify::recommended_watcher(
        move |res: std::result::Result<Event, notify::Error>| match res {
            Ok(event) => {
                if is_relevant(&event, target.as_ref()) {
                    debug!(kind = ?event.kind, "rule file changed");
                    // A full channel already holds a pending reload.
                    let _ = tx.try_send(());
                }
            }
            Err(e) => warn!(error = %e, "filesystem watcher error"),
        },
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!(path = %path.display(), "watching rule file for changes");
    Ok(watcher)
}

fn is_relevant(event: &Event, target: Option<&OsString>) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(CreateKind::File)
            | EventKind::Create(CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Remove(RemoveKind::File)
            | EventKind::Remove(RemoveKind::Any)
    );
    if !kind_matches {
        return false;
    }

    match target {
        Some(target) => event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == target.as_os_str())),
        None => true,
    }
}
