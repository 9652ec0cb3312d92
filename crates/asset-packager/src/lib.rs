//! Live asset index and on-demand package builder.
//!
//! This crate provides the core of the asset packager:
//! - An in-memory index of the files under a watched root, kept current by
//!   filesystem events
//! - A builder that streams a requested subset of those files into a
//!   gzip-compressed tar archive, followed by a `metadata.json` manifest

pub mod archive;
pub mod error;
pub mod index;
pub mod types;
pub mod watcher;

// Re-export main types
pub use archive::{build_package, AssetSource, PackageManifest, METADATA_ENTRY_NAME};
pub use error::{PackagerError, Result};
pub use index::AssetIndex;
pub use types::{AssetState, IndexStatus};
pub use watcher::{AssetEvent, AssetEventKind};
