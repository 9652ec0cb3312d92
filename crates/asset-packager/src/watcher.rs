//! Filesystem watching module.
//!
//! This module is the event source behind the asset index:
//! - notify watchers registered per walked path
//! - Normalization of raw notify events into create/remove/rename events
//! - Tree walking and relative path handling

mod events;
mod walker;

pub use events::{create_asset_watcher, normalize_event, watch_path, AssetEvent, AssetEventKind};
pub use walker::{relative_asset_key, walk_tree, WalkStats};
