//! Package building.
//!
//! A package is a gzip-compressed tar stream holding the requested assets
//! that could be read, in request order, followed by a `metadata.json`
//! manifest listing what was requested and what failed.

mod builder;
mod manifest;


use std::path::PathBuf;

pub use builder::{build_package, entry_name, METADATA_ENTRY_NAME, METADATA_MODE};
pub use manifest::PackageManifest;

/// Where the builder looks up and resolves requested assets.
pub trait AssetSource {
    /// Returns true if the asset is currently believed to exist.
    fn exists(&self, relative_path: &str) -> bool;

    /// Absolute path the asset would be read from.
    fn resolve(&self, relative_path: &str) -> PathBuf;
}
