use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PackagerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Watcher error: {0}")]
    Watch(String),

    /// Writing archive framing or entry bytes failed; the output is unusable.
    #[error("Archive write failed ({context}): {source}")]
    ArchiveWrite {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PackagerError {
    pub(crate) fn archive_write(context: impl Into<String>, source: io::Error) -> Self {
        Self::ArchiveWrite {
            context: context.into(),
            source,
        }
    }

    /// Returns true when the error aborted an archive mid-stream.
    pub fn is_archive_write(&self) -> bool {
        matches!(self, Self::ArchiveWrite { .. })
    }
}

pub type Result<T> = std::result::Result<T, PackagerError>;

/// Canonicalizes a path, returning the original if canonicalization fails.
pub fn canonicalize_existing_path(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}
