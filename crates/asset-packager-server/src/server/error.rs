use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use asset_packager::PackagerError;

/// Standardised API error response body.
///
/// Every error returned by the HTTP layer serialises as:
/// ```json
/// { "ok": false, "error": { "code": "<code>", "message": "<message>" } }
/// ```
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorResponse,
}

#[derive(Debug, Serialize)]
struct ApiErrorResponse {
    ok: bool,
    error: ApiErrorBody,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorResponse {
                ok: false,
                error: ApiErrorBody {
                    code,
                    message: message.into(),
                },
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<PackagerError> for ApiError {
    fn from(err: PackagerError) -> Self {
        match err {
            PackagerError::InvalidInput(msg) => Self::bad_request(msg),
            other => {
                log::error!("package request failed: {other}");
                Self::internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn archive_write_failures_map_to_internal() {
        let error = PackagerError::ArchiveWrite {
            context: "pkg/x.txt".to_string(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "closed"),
        };
        let api_error = ApiError::from(error);
        assert_eq!(api_error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.body.error.code, "internal");
    }

    #[test]
    fn invalid_input_maps_to_bad_request() {
        let api_error = ApiError::from(PackagerError::InvalidInput("bad prefix".to_string()));
        assert_eq!(api_error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api_error.body.error.message, "bad prefix");
    }
}
