//! HTTP gateway handlers and the state they share.

pub mod health;
pub mod records;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use records::{
    create_record_handler, fallback_handler, get_record_handler, list_records_handler,
    rpc_handler,
};

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::response::{IntoResponse, Response};
use axum::Json;
use roster_core::{RpcStatus, StatusCode};
use serde::{Deserialize, Serialize};

use super::HealthMonitor;
use crate::service::RecordService;

/// State carried through axum extractors. Cloning copies two `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RecordService>,
    pub health: Arc<HealthMonitor>,
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<RecordService>, health: Arc<HealthMonitor>) -> Self {
        Self {
            service,
            health,
            start_time: Instant::now(),
        }
    }
}

/// JSON error body: `{"code": <int>, "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
}

/// An [`RpcStatus`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub RpcStatus);

/// HTTP status for each RPC code.
#[must_use]
pub fn http_status(code: StatusCode) -> axum::http::StatusCode {
    use axum::http::StatusCode as Http;
    match code {
        StatusCode::Ok => Http::OK,
        StatusCode::InvalidArgument => Http::BAD_REQUEST,
        StatusCode::NotFound => Http::NOT_FOUND,
        StatusCode::Unimplemented => Http::NOT_IMPLEMENTED,
        StatusCode::Internal => Http::INTERNAL_SERVER_ERROR,
        StatusCode::Unavailable => Http::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.0.code.as_i32(),
            message: self.0.message,
        };
        (http_status(self.0.code), Json(body)).into_response()
    }
}

impl From<RpcStatus> for ApiError {
    fn from(status: RpcStatus) -> Self {
        Self(status)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(RpcStatus::invalid_argument(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(RpcStatus::invalid_argument(rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_maps_to_expected_http_status() {
        use axum::http::StatusCode as Http;
        assert_eq!(http_status(StatusCode::InvalidArgument), Http::BAD_REQUEST);
        assert_eq!(http_status(StatusCode::NotFound), Http::NOT_FOUND);
        assert_eq!(http_status(StatusCode::Unimplemented), Http::NOT_IMPLEMENTED);
        assert_eq!(http_status(StatusCode::Internal), Http::INTERNAL_SERVER_ERROR);
        assert_eq!(http_status(StatusCode::Unavailable), Http::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn api_error_renders_code_and_message() {
        let response = ApiError(RpcStatus::not_found("gone")).into_response();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            ErrorBody {
                code: 5,
                message: "gone".into()
            }
        );
    }
}
