//! State shared between an `AssetIndex` and its worker threads.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use super::presence::PresenceMap;
use crate::watcher::{relative_asset_key, AssetEvent};

#[derive(Debug)]
pub struct SharedAssetIndex {
    /// Canonical root directory.
    pub root: PathBuf,
    /// Relative path → presence.
    pub presence: PresenceMap,
    /// Events applied to `presence` since the index was opened.
    pub applied_events: AtomicU64,
    /// Errors reported by the watcher or while registering watches.
    pub watch_errors: AtomicU64,
}

impl SharedAssetIndex {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            presence: PresenceMap::new(),
            applied_events: AtomicU64::new(0),
            watch_errors: AtomicU64::new(0),
        }
    }

    /// Applies one event to the presence map.
    ///
    /// Returns false when the event's path does not resolve to an asset key
    /// under the root (the root itself, or anything outside it).
    pub fn apply_event(&self, event: &AssetEvent) -> bool {
        let Some(key) = relative_asset_key(&self.root, &event.path) else {
            return false;
        };
        log::debug!("asset event {:?} {}", event.kind, key);
        self.presence.apply(event.kind, &key);
        self.applied_events.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn record_watch_error(&self) {
        self.watch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn applied_events(&self) -> u64 {
        self.applied_events.load(Ordering::Relaxed)
    }

    pub fn watch_errors(&self) -> u64 {
        self.watch_errors.load(Ordering::Relaxed)
    }
}
