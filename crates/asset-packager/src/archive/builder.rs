//! Streams requested assets into a gzip-compressed tar archive.

use std::fmt;
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::time::UNIX_EPOCH;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};

use super::manifest::PackageManifest;
use super::AssetSource;
use crate::error::{PackagerError, Result};

/// Name of the manifest entry appended after all assets.
pub const METADATA_ENTRY_NAME: &str = "metadata.json";

/// Mode bits of the manifest entry.
pub const METADATA_MODE: u32 = 0o600;

/// Why a requested asset was left out of a package.
enum EntryFailure {
    NotIndexed,
    Stat(io::Error),
    NotAFile,
    Open(io::Error),
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotIndexed => write!(f, "not present in the asset index"),
            Self::Stat(error) => write!(f, "stat failed: {error}"),
            Self::NotAFile => write!(f, "not a regular file"),
            Self::Open(error) => write!(f, "open failed: {error}"),
        }
    }
}

/// Joins the package prefix and an asset path into an archive entry name.
///
/// An empty prefix yields the bare asset path.
pub fn entry_name(prefix: &str, relative_path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        relative_path.to_string()
    } else {
        format!("{prefix}/{relative_path}")
    }
}

/// Writes a package containing `requested` to `destination`.
///
/// Each path is looked up in `source`. Paths that are not indexed, cannot be
/// stat'ed, are not regular files, or cannot be opened are recorded in the
/// manifest's failed list and skipped. Everything else is appended in request
/// order, followed by `prefix/metadata.json`.
///
/// Any failure to write archive bytes aborts the whole build with
/// [`PackagerError::ArchiveWrite`]; the destination then holds a truncated
/// stream and must be discarded. On success the tar and gzip trailers have
/// both been written.
pub fn build_package<A, W, S>(
    source: &A,
    destination: W,
    prefix: &str,
    requested: &[S],
) -> Result<PackageManifest>
where
    A: AssetSource + ?Sized,
    W: Write,
    S: AsRef<str>,
{
    validate_prefix(prefix)?;

    let encoder = GzEncoder::new(destination, Compression::default());
    let mut archive = Builder::new(encoder);
    let mut manifest = PackageManifest::new();

    for path in requested {
        let path = path.as_ref();
        manifest.record_requested(path);

        match open_asset(source, path) {
            Ok((file, metadata)) => {
                append_asset(&mut archive, &entry_name(prefix, path), file, &metadata)?;
            }
            Err(failure) => {
                log::debug!("package resource {path} failed: {failure}");
                manifest.record_failed(path);
            }
        }
    }

    let manifest_bytes = manifest.to_json_bytes()?;
    let metadata_name = entry_name(prefix, METADATA_ENTRY_NAME);
    let mut header = entry_header(manifest_bytes.len() as u64, METADATA_MODE);
    archive
        .append_data(&mut header, &metadata_name, manifest_bytes.as_slice())
        .map_err(|error| PackagerError::archive_write(metadata_name.as_str(), error))?;

    let encoder = archive
        .into_inner()
        .map_err(|error| PackagerError::archive_write("tar trailer", error))?;
    encoder
        .finish()
        .map_err(|error| PackagerError::archive_write("gzip trailer", error))?;

    if !manifest.failed.is_empty() {
        log::info!(
            "package built with {} of {} resources missing",
            manifest.failed.len(),
            manifest.requested.len()
        );
    }
    Ok(manifest)
}

/// Rejects prefixes the tar format cannot carry, before anything is written.
fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.split('/').any(|segment| segment == "..") {
        return Err(PackagerError::InvalidInput(format!(
            "package prefix must not contain '..': {prefix}"
        )));
    }
    Ok(())
}

fn open_asset<A>(source: &A, path: &str) -> std::result::Result<(File, Metadata), EntryFailure>
where
    A: AssetSource + ?Sized,
{
    if !source.exists(path) {
        return Err(EntryFailure::NotIndexed);
    }
    let absolute = source.resolve(path);
    let metadata = fs::metadata(&absolute).map_err(EntryFailure::Stat)?;
    if !metadata.is_file() {
        return Err(EntryFailure::NotAFile);
    }
    let file = File::open(&absolute).map_err(EntryFailure::Open)?;
    Ok((file, metadata))
}

fn append_asset<W: Write>(
    archive: &mut Builder<W>,
    name: &str,
    file: File,
    metadata: &Metadata,
) -> Result<()> {
    let size = metadata.len();
    let mut header = entry_header(size, file_mode(metadata));
    if let Some(mtime) = modified_secs(metadata) {
        header.set_mtime(mtime);
    }

    // The body must be exactly `size` bytes even if the file changed after stat.
    let body = file.take(size).chain(io::repeat(0)).take(size);
    archive
        .append_data(&mut header, name, body)
        .map_err(|error| PackagerError::archive_write(name, error))
}

fn entry_header(size: u64, mode: u32) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(size);
    header.set_mode(mode);
    header
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn modified_secs(metadata: &Metadata) -> Option<u64> {
    metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|duration| duration.as_secs())
}
