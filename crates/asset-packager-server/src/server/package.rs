//! Package API endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

use crate::server::error::ApiError;
use crate::server::ServerState;

pub const PACKAGE_CONTENT_TYPE: &str = "application/gzip";
pub const PACKAGE_CONTENT_ENCODING: &str = "gzip";

/// Decodes a JSON array of relative asset paths into a request.
pub fn parse_package_request(body: &[u8]) -> Result<Vec<String>, ApiError> {
    serde_json::from_slice(body).map_err(|error| {
        ApiError::bad_request(format!(
            "package request must be a JSON array of paths: {error}"
        ))
    })
}

/// Builds a package of the requested assets.
///
/// The archive is built in memory on a blocking thread, so the caller gets
/// either the complete archive or an error response, never a truncated body.
pub(crate) async fn build(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let requested = parse_package_request(&body)?;
    let index = state.index.clone();
    let prefix = state.package_prefix.clone();

    let (archive, manifest) = tokio::task::spawn_blocking(move || {
        let mut archive = Vec::new();
        index
            .package(&mut archive, &prefix, requested.as_slice())
            .map(|manifest| (archive, manifest))
    })
    .await
    .map_err(|error| ApiError::internal(format!("package task failed: {error}")))??;

    log::info!(
        "served package requested={} failed={} bytes={}",
        manifest.requested.len(),
        manifest.failed.len(),
        archive.len()
    );

    Ok((
        [
            (CONTENT_TYPE, PACKAGE_CONTENT_TYPE),
            (CONTENT_ENCODING, PACKAGE_CONTENT_ENCODING),
        ],
        archive,
    )
        .into_response())
}
