//! RPC listener and client, HTTP gateway, and shared health state.

pub mod config;
pub mod gateway;
pub mod handlers;
pub mod health;
pub mod rpc_client;
pub mod rpc_server;

pub use config::NetworkConfig;
pub use gateway::{build_router, HttpGateway};
pub use handlers::AppState;
pub use health::{HealthMonitor, HealthState, InFlightGuard};
pub use rpc_client::{ClientError, RpcClient};
pub use rpc_server::RpcServer;
