//! Index status endpoints.

use std::sync::Arc;

use asset_packager::AssetState;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::error::ApiError;
use crate::server::ServerState;

/// Response payload for index status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatusResponse {
    pub root: String,
    pub known_assets: usize,
    pub present_assets: usize,
    pub applied_events: u64,
    pub watch_errors: u64,
    pub watching: bool,
}

impl From<asset_packager::IndexStatus> for IndexStatusResponse {
    fn from(status: asset_packager::IndexStatus) -> Self {
        Self {
            root: status.root,
            known_assets: status.known_assets,
            present_assets: status.present_assets,
            applied_events: status.applied_events,
            watch_errors: status.watch_errors,
            watching: status.watching,
        }
    }
}

pub(crate) async fn index_status(State(state): State<Arc<ServerState>>) -> Json<IndexStatusResponse> {
    Json(state.index.status().into())
}

/// Lists the assets currently marked present.
pub(crate) async fn list_assets(State(state): State<Arc<ServerState>>) -> Json<Vec<String>> {
    Json(state.index.present_assets())
}

#[derive(Debug, Deserialize)]
pub struct AssetStateQuery {
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssetStateResponse {
    pub path: String,
    pub state: AssetState,
}

/// Reports whether a path is present, removed, or was never seen.
pub(crate) async fn asset_state(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<AssetStateQuery>,
) -> Result<Json<AssetStateResponse>, ApiError> {
    let path = query
        .path
        .filter(|path| !path.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing required query parameter: path"))?;
    let asset_state = state.index.state(&path);
    Ok(Json(AssetStateResponse {
        path,
        state: asset_state,
    }))
}
