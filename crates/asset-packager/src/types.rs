//! Result types exposed by the asset index.
//!
//! The server crate converts these to API payload types for serialization.

use serde::Serialize;

/// What the index knows about a relative path.
///
/// Paths are never dropped from the index once observed, so a removed asset
/// stays distinguishable from one that was never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetState {
    Unknown,
    Present,
    Removed,
}

impl AssetState {
    pub fn from_presence(presence: Option<bool>) -> Self {
        match presence {
            None => Self::Unknown,
            Some(true) => Self::Present,
            Some(false) => Self::Removed,
        }
    }
}

/// Index status information.
#[derive(Debug, Clone)]
pub struct IndexStatus {
    /// Root path being indexed.
    pub root: String,
    /// Number of relative paths ever observed.
    pub known_assets: usize,
    /// Number of relative paths currently marked present.
    pub present_assets: usize,
    /// Number of filesystem events applied since the index was opened.
    pub applied_events: u64,
    /// Number of errors reported by the watcher.
    pub watch_errors: u64,
    /// Whether the watch subscription is still open.
    pub watching: bool,
}
