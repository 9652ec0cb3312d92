//! Presence map shared between the event consumer and package readers.

use fnv::FnvHashMap;
use parking_lot::RwLock;

use crate::watcher::AssetEventKind;

/// Map from relative asset path to "currently present".
///
/// Entries are never removed: a removed asset is kept with `false` so it
/// stays distinguishable from a path that was never observed. Every access
/// takes the lock for a single operation, so readers always see either the
/// value before or after a write.
#[derive(Debug, Default)]
pub struct PresenceMap {
    entries: RwLock<FnvHashMap<String, bool>>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` present.
    pub fn mark_present(&self, key: impl Into<String>) {
        self.entries.write().insert(key.into(), true);
    }

    /// Marks `key` absent, recording it if it was unknown.
    pub fn mark_absent(&self, key: impl Into<String>) {
        self.entries.write().insert(key.into(), false);
    }

    /// Applies a single event to `key`.
    pub fn apply(&self, kind: AssetEventKind, key: &str) {
        match kind {
            AssetEventKind::Created => self.mark_present(key),
            AssetEventKind::Removed | AssetEventKind::Renamed => self.mark_absent(key),
        }
    }

    /// Returns the recorded value, `None` if the key was never observed.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries.read().get(key).copied()
    }

    /// Returns true if `key` is currently marked present.
    pub fn is_present(&self, key: &str) -> bool {
        self.get(key).unwrap_or(false)
    }

    /// Number of keys ever observed.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Number of keys currently marked present.
    pub fn present_count(&self) -> usize {
        self.entries.read().values().filter(|present| **present).count()
    }

    /// Returns the present keys, sorted.
    pub fn present_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, present)| **present)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}
