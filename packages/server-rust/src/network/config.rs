//! Listener and transport settings.

use std::net::SocketAddr;
use std::time::Duration;

/// Default cap on a single RPC frame body.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

/// Network configuration shared by the RPC server and the HTTP gateway.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// RPC listen address. Port 0 means OS-assigned.
    pub rpc_addr: SocketAddr,
    /// HTTP gateway listen address. Port 0 means OS-assigned.
    pub http_addr: SocketAddr,
    /// Allowed CORS origins; `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Maximum time an HTTP request may take.
    pub request_timeout: Duration,
    /// Largest accepted RPC frame body in bytes.
    pub max_frame_length: usize,
    /// How long listeners wait for in-flight calls after being interrupted.
    pub drain_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_addr: SocketAddr::from(([0, 0, 0, 0], 6565)),
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            drain_timeout: Duration::from_secs(10),
        }
    }
}

impl NetworkConfig {
    /// Loopback config on ephemeral ports, for tests and embedding.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            rpc_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            http_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Self::default()
        }
    }
}
