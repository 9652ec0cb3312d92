use asset_packager::PackagerError;

/// Errors raised while configuring or starting the gateway.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Packager(#[from] PackagerError),
}

/// Result type alias using [`ServerError`].
pub type ServerResult<T> = Result<T, ServerError>;
