//! Filesystem watching with notify.
//!
//! Watcher callbacks never touch index state. Normalized events go to the
//! event channel and watcher errors go to a separate error channel; the index
//! owns one consumer for each.

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use notify::event::{ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{PackagerError, Result};

/// Kind of a normalized filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetEventKind {
    Created,
    Removed,
    Renamed,
}

/// A filesystem mutation reported for a single absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEvent {
    pub kind: AssetEventKind,
    pub path: PathBuf,
}

impl AssetEvent {
    pub fn new(kind: AssetEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(AssetEventKind::Created, path)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(AssetEventKind::Removed, path)
    }

    pub fn renamed(path: impl Into<PathBuf>) -> Self {
        Self::new(AssetEventKind::Renamed, path)
    }
}

/// Converts a raw notify event into zero or more asset events.
///
/// Renames are split by side: the source path becomes `Renamed` and the
/// destination path becomes `Created`. When the backend cannot tell which
/// side a path is on, the path's current existence decides. Access and
/// content-modification events produce nothing.
pub fn normalize_event(event: Event) -> Vec<AssetEvent> {
    match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(AssetEvent::created).collect(),
        EventKind::Remove(_) => event.paths.into_iter().map(AssetEvent::removed).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => normalize_rename(mode, event.paths),
        _ => Vec::new(),
    }
}

fn normalize_rename(mode: RenameMode, paths: Vec<PathBuf>) -> Vec<AssetEvent> {
    match mode {
        RenameMode::From => paths.into_iter().map(AssetEvent::renamed).collect(),
        RenameMode::To => paths.into_iter().map(AssetEvent::created).collect(),
        RenameMode::Both => {
            let mut paths = paths.into_iter();
            let mut events = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                events.push(AssetEvent::renamed(from));
            }
            if let Some(to) = paths.next() {
                events.push(AssetEvent::created(to));
            }
            events
        }
        _ => paths
            .into_iter()
            .map(|path| {
                if path.exists() {
                    AssetEvent::created(path)
                } else {
                    AssetEvent::renamed(path)
                }
            })
            .collect(),
    }
}

/// Creates a notify watcher that forwards normalized events to `event_tx` and
/// errors to `error_tx`.
///
/// No paths are watched yet; callers register them with [`watch_path`].
/// Dropping the returned watcher drops both senders, which disconnects the
/// channels.
pub fn create_asset_watcher(
    event_tx: Sender<AssetEvent>,
    error_tx: Sender<notify::Error>,
) -> Result<RecommendedWatcher> {
    recommended_watcher(move |event_result: notify::Result<Event>| match event_result {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            for asset_event in normalize_event(event) {
                let _ = event_tx.send(asset_event);
            }
        }
        Err(error) => {
            let _ = error_tx.send(error);
        }
    })
    .map_err(|error| PackagerError::Watch(format!("failed to create filesystem watcher: {error}")))
}

/// Registers a non-recursive watch on a single path.
pub fn watch_path(watcher: &mut RecommendedWatcher, path: &Path) -> Result<()> {
    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|error| PackagerError::Watch(format!("failed to watch {}: {error}", path.display())))
}
