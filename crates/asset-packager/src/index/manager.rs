//! AssetIndex - main API for the live asset index.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver};
use notify::RecommendedWatcher;
use parking_lot::Mutex;

use super::shared::SharedAssetIndex;
use crate::archive::{build_package, AssetSource, PackageManifest};
use crate::error::{canonicalize_existing_path, PackagerError, Result};
use crate::types::{AssetState, IndexStatus};
use crate::watcher::{
    create_asset_watcher, relative_asset_key, walk_tree, watch_path, AssetEvent, AssetEventKind,
};

type WatcherSlot = Arc<Mutex<Option<RecommendedWatcher>>>;

/// Live index of the files under a root directory.
///
/// Lookups are eventually consistent: a query made right after a change on
/// disk may return the previous answer until the watcher has delivered the
/// event and the consumer thread has applied it.
pub struct AssetIndex {
    shared: Arc<SharedAssetIndex>,
    watcher: WatcherSlot,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for AssetIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetIndex")
            .field("shared", &self.shared)
            .field("watcher", &"<watcher>")
            .finish()
    }
}

impl AssetIndex {
    /// Walks `root`, watches every entry found, and starts the event and
    /// error consumer threads.
    ///
    /// Fails with [`PackagerError::NotFound`] or [`PackagerError::NotADirectory`]
    /// before any watcher or thread is created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let init_started = Instant::now();
        let root = resolve_root(root.as_ref())?;

        let (event_tx, event_rx) = unbounded::<AssetEvent>();
        let (error_tx, error_rx) = unbounded::<notify::Error>();
        let mut watcher = create_asset_watcher(event_tx, error_tx)?;
        let shared = Arc::new(SharedAssetIndex::new(root.clone()));

        let stats = walk_tree(&root, &mut |path: &Path, is_dir: bool| {
            register_entry(&shared, &mut watcher, path, is_dir);
        })?;

        let watcher: WatcherSlot = Arc::new(Mutex::new(Some(watcher)));
        let consumer = spawn_event_consumer(shared.clone(), watcher.clone(), event_rx)?;
        let logger = match spawn_error_logger(shared.clone(), error_rx) {
            Ok(handle) => handle,
            Err(error) => {
                drop(watcher.lock().take());
                let _ = consumer.join();
                return Err(error);
            }
        };

        log::info!(
            "asset index init root={} files={} dirs={} walk_errors={} total_init_ms={}",
            root.display(),
            stats.files,
            stats.dirs,
            stats.errors,
            init_started.elapsed().as_millis(),
        );

        Ok(Self {
            shared,
            watcher,
            workers: Mutex::new(vec![consumer, logger]),
        })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    /// Returns true if `relative_path` is currently marked present.
    ///
    /// Unknown paths are absent. See the type docs for the staleness window.
    pub fn exists(&self, relative_path: &str) -> bool {
        self.shared.presence.is_present(relative_path)
    }

    /// Returns what the index knows about `relative_path`.
    pub fn state(&self, relative_path: &str) -> AssetState {
        AssetState::from_presence(self.shared.presence.get(relative_path))
    }

    /// Absolute path of an asset under the root.
    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        self.shared.root.join(relative_path)
    }

    /// Relative paths currently marked present, sorted.
    pub fn present_assets(&self) -> Vec<String> {
        self.shared.presence.present_keys()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    pub fn status(&self) -> IndexStatus {
        IndexStatus {
            root: self.shared.root.to_string_lossy().to_string(),
            known_assets: self.shared.presence.len(),
            present_assets: self.shared.presence.present_count(),
            applied_events: self.shared.applied_events(),
            watch_errors: self.shared.watch_errors(),
            watching: self.is_watching(),
        }
    }

    /// Builds a package of `requested` into `destination`.
    ///
    /// See [`build_package`] for the archive layout and failure policy.
    pub fn package<W, S>(&self, destination: W, prefix: &str, requested: &[S]) -> Result<PackageManifest>
    where
        W: Write,
        S: AsRef<str>,
    {
        build_package(self, destination, prefix, requested)
    }

    /// Closes the watch subscription and waits for both worker threads to
    /// drain their channels and exit.
    ///
    /// The presence map stays readable afterwards. Calling `close` again is a
    /// no-op.
    pub fn close(&self) {
        let watcher = self.watcher.lock().take();
        if watcher.is_none() {
            return;
        }
        // Dropping the watcher drops the channel senders held by its callback.
        drop(watcher);

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.join().is_err() {
                log::warn!(
                    "asset index worker panicked for {}",
                    self.shared.root.display()
                );
            }
        }
        log::info!("asset index closed root={}", self.shared.root.display());
    }
}

impl Drop for AssetIndex {
    fn drop(&mut self) {
        self.close();
    }
}

impl AssetSource for AssetIndex {
    fn exists(&self, relative_path: &str) -> bool {
        AssetIndex::exists(self, relative_path)
    }

    fn resolve(&self, relative_path: &str) -> PathBuf {
        AssetIndex::resolve(self, relative_path)
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    let absolute = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    let metadata = match fs::metadata(&absolute) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(PackagerError::NotFound(absolute));
        }
        Err(error) => return Err(error.into()),
    };
    if !metadata.is_dir() {
        return Err(PackagerError::NotADirectory(absolute));
    }
    Ok(canonicalize_existing_path(absolute))
}

/// Watches a walked entry and records it if it is a file.
fn register_entry(
    shared: &SharedAssetIndex,
    watcher: &mut RecommendedWatcher,
    path: &Path,
    is_dir: bool,
) {
    // A watch on a link would report events from its target. The parent
    // directory's watch already covers the link itself.
    if !is_symlink(path) {
        if let Err(error) = watch_path(watcher, path) {
            shared.record_watch_error();
            log::warn!("{error}");
        }
    }
    if is_dir {
        return;
    }
    if let Some(key) = relative_asset_key(&shared.root, path) {
        shared.presence.mark_present(key);
    }
}

fn spawn_event_consumer(
    shared: Arc<SharedAssetIndex>,
    watcher: WatcherSlot,
    event_rx: Receiver<AssetEvent>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("asset-index-events".to_string())
        .spawn(move || {
            for event in event_rx.iter() {
                if event.kind == AssetEventKind::Created && is_unlinked_dir(&event.path) {
                    watch_new_directory(&shared, &watcher, &event.path);
                }
                shared.apply_event(&event);
            }
            log::debug!(
                "asset index event loop stopped for {}",
                shared.root.display()
            );
        })?;
    Ok(handle)
}

fn spawn_error_logger(
    shared: Arc<SharedAssetIndex>,
    error_rx: Receiver<notify::Error>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("asset-index-errors".to_string())
        .spawn(move || {
            for error in error_rx.iter() {
                shared.record_watch_error();
                log::warn!(
                    "asset watcher error for {}: {error}",
                    shared.root.display()
                );
            }
        })?;
    Ok(handle)
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|metadata| metadata.file_type().is_symlink())
        .unwrap_or(false)
}

/// True for real directories. Symlinks are never followed, matching the walk.
fn is_unlinked_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

/// Watches a directory created after the initial walk, along with anything
/// already inside it.
fn watch_new_directory(shared: &SharedAssetIndex, watcher: &WatcherSlot, dir: &Path) {
    let mut slot = watcher.lock();
    let Some(watcher) = slot.as_mut() else {
        return;
    };
    if let Err(error) = walk_tree(dir, &mut |path: &Path, is_dir: bool| {
        register_entry(shared, watcher, path, is_dir);
    }) {
        log::debug!("unable to walk new directory {}: {error}", dir.display());
    }
}
