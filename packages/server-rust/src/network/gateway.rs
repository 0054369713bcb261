//! HTTP/JSON gateway: router assembly and the serve loop.
//!
//! Binding happens in [`HttpGateway::bind`] so that a port conflict surfaces
//! before any actor starts; [`HttpGateway::serve`] then runs until the
//! supplied shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::HeaderName;
use axum::http::{Method, Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};

use super::config::NetworkConfig;
use super::handlers::{
    create_record_handler, fallback_handler, get_record_handler, health_handler,
    list_records_handler, liveness_handler, readiness_handler, rpc_handler, AppState,
};

const REQUEST_ID: &str = "x-request-id";

/// Routes:
/// - `POST /v1/records`, `GET /v1/records`, `GET /v1/records/{id}`
/// - `POST /rpc` for method-tagged JSON calls
/// - `GET /health`, `/health/live`, `/health/ready`
///
/// Every request gets an `X-Request-Id` (kept if the caller sent one), a
/// tracing span carrying that id, CORS handling, and a 408 once
/// `request_timeout` elapses. The id is echoed on the response.
pub fn build_router(state: AppState, config: &NetworkConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID);
    let layers = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let id = request
                .headers()
                .get(REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            info_span!(
                "gateway",
                method = %request.method(),
                path = request.uri().path(),
                request_id = id
            )
        }))
        .layer(cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(request_id));

    Router::new()
        .route(
            "/v1/records",
            post(create_record_handler).get(list_records_handler),
        )
        .route("/v1/records/{id}", get(get_record_handler))
        .route("/rpc", post(rpc_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .fallback(fallback_handler)
        .layer(layers)
        .with_state(state)
}

/// Browser clients only need the record routes, so only `GET` and `POST`
/// are allowed cross-origin. Unparseable origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| o.parse().ok()))
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// A bound, not yet serving, HTTP listener.
pub struct HttpGateway {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
    drain_timeout: Duration,
    state: AppState,
}

impl HttpGateway {
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(config: &NetworkConfig, state: AppState) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.http_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "HTTP gateway bound");

        Ok(Self {
            listener,
            router: build_router(state.clone(), config),
            local_addr,
            drain_timeout: config.drain_timeout,
            state,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until `shutdown` resolves, then lets open requests finish.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal I/O failure of the listener.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        info!(addr = %self.local_addr, "serving HTTP gateway");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        if !self.state.health.wait_for_drain(self.drain_timeout).await {
            warn!("HTTP drain timed out with calls still in flight");
        }
        info!("HTTP gateway stopped");
        Ok(())
    }
}
