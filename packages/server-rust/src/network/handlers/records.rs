//! JSON routes over the record service.
//!
//! Each route builds the matching [`RpcRequest`] and goes through
//! [`RecordService::dispatch`](crate::service::RecordService::dispatch), so
//! the HTTP surface serves exactly the methods the RPC surface does.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use roster_core::messages::{
    CreateRecordRequest, CreateRecordResponse, GetRecordRequest, GetRecordResponse,
    ListRecordsRequest, ListRecordsResponse, RpcRequest, RpcResponse,
};
use roster_core::RpcStatus;

use super::{ApiError, AppState};

async fn call(state: &AppState, request: RpcRequest) -> Result<RpcResponse, ApiError> {
    let _guard = state.health.in_flight_guard();
    Ok(state.service.dispatch(request).await?)
}

fn mismatched(expected: &str, got: &RpcResponse) -> ApiError {
    ApiError(RpcStatus::internal(format!(
        "expected {expected} response, got {got:?}"
    )))
}

/// `POST /v1/records` with `{"record": {"name": ..., "type": ...}}`.
pub async fn create_record_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateRecordRequest>, JsonRejection>,
) -> Result<Json<CreateRecordResponse>, ApiError> {
    let Json(req) = payload?;
    match call(&state, RpcRequest::CreateRecord(req)).await? {
        RpcResponse::CreateRecord(resp) => Ok(Json(resp)),
        other => Err(mismatched("CreateRecord", &other)),
    }
}

/// `GET /v1/records`
pub async fn list_records_handler(
    State(state): State<AppState>,
) -> Result<Json<ListRecordsResponse>, ApiError> {
    match call(&state, RpcRequest::ListRecords(ListRecordsRequest {})).await? {
        RpcResponse::ListRecords(resp) => Ok(Json(resp)),
        other => Err(mismatched("ListRecords", &other)),
    }
}

/// `GET /v1/records/{id}`
pub async fn get_record_handler(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<GetRecordResponse>, ApiError> {
    let Path(id) = id?;
    match call(&state, RpcRequest::GetRecord(GetRecordRequest { id })).await? {
        RpcResponse::GetRecord(resp) => Ok(Json(resp)),
        other => Err(mismatched("GetRecord", &other)),
    }
}

/// `POST /rpc`: a method-tagged request as JSON, answered with the
/// method-tagged response.
pub async fn rpc_handler(
    State(state): State<AppState>,
    payload: Result<Json<RpcRequest>, JsonRejection>,
) -> Result<Json<RpcResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(call(&state, request).await?))
}

/// Unmatched paths.
pub async fn fallback_handler(uri: axum::http::Uri) -> ApiError {
    ApiError(RpcStatus::not_found(format!("no route for {}", uri.path())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::network::gateway::build_router;
    use crate::network::handlers::AppState;
    use crate::network::{HealthMonitor, NetworkConfig};
    use crate::service::{ApiProfile, RecordService};
    use crate::storage::MemoryStore;

    fn router(profile: ApiProfile) -> Router {
        let service = RecordService::new(Arc::new(MemoryStore::new()), profile);
        let state = AppState::new(Arc::new(service), Arc::new(HealthMonitor::new()));
        build_router(state, &NetworkConfig::ephemeral())
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_over_http() {
        let router = router(ApiProfile::Memory);

        let (status, created) = send(
            &router,
            post_json(
                "/v1/records",
                &json!({"record": {"name": "alice", "type": "admin"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let (status, fetched) = send(
            &router,
            Request::get(format!("/v1/records/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            fetched,
            json!({"record": {"id": id, "name": "alice", "type": "admin"}})
        );
    }

    #[tokio::test]
    async fn create_without_record_is_bad_request() {
        let router = router(ApiProfile::Memory);
        let (status, body) = send(&router, post_json("/v1/records", &json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 3);
        assert_eq!(body["message"], "record required");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let router = router(ApiProfile::Memory);
        let request = Request::post("/v1/records")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 3);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let router = router(ApiProfile::Memory);
        let (status, body) = send(
            &router,
            Request::get("/v1/records/missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 5);
    }

    #[tokio::test]
    async fn list_outside_profile_is_not_implemented() {
        let router = router(ApiProfile::Memory);
        let (status, body) = send(
            &router,
            Request::get("/v1/records").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["code"], 12);
    }

    #[tokio::test]
    async fn durable_profile_lists_created_records() {
        let router = router(ApiProfile::Durable);
        for name in ["a", "b"] {
            let (status, _) = send(
                &router,
                post_json("/v1/records", &json!({"record": {"name": name, "type": "t"}})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &router,
            Request::get("/v1/records").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let mut names: Vec<_> = body["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn rpc_route_accepts_tagged_request() {
        let router = router(ApiProfile::Memory);
        let (status, body) = send(
            &router,
            post_json(
                "/rpc",
                &json!({"method": "CreateRecord", "record": {"name": "n", "type": "t"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], "CreateRecord");
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_json() {
        let router = router(ApiProfile::Memory);
        let (status, body) = send(
            &router,
            Request::get("/v2/nothing").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 5);
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let router = router(ApiProfile::Memory);
        let response = router
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
