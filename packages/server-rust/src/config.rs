//! Command-line and environment configuration.
//!
//! `clap` parses flags with environment fallbacks into the `*Args` structs;
//! those are then converted into the plain config structs the rest of the
//! crate consumes, so library code never depends on `clap`.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use clap::{Args, Parser, ValueEnum};

use crate::network::NetworkConfig;
use crate::service::ApiProfile;
use crate::storage::sql::{DatabaseConfig, DEFAULT_OPERATION_TIMEOUT};
use crate::telemetry::LogFormat;

/// Which [`RecordStore`](crate::storage::RecordStore) implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreKind {
    /// Volatile in-process map.
    #[default]
    Memory,
    /// Durable SQL database.
    Sql,
}

/// Store selection plus the settings the chosen backend needs.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub operation_timeout: Duration,
    pub database: DatabaseConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            database: DatabaseConfig::default(),
        }
    }
}

/// Database connection flags shared by the server and migration binaries.
#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// Full connection URL; overrides the individual settings below.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(long, env = "DATABASE_DRIVER", default_value = "mysql")]
    pub database_driver: String,
    #[arg(long, env = "DATABASE_NAME", default_value = "")]
    pub database_name: String,
    #[arg(long, env = "DATABASE_USERNAME", default_value = "")]
    pub database_username: String,
    #[arg(long, env = "DATABASE_PASSWORD", default_value = "", hide_env_values = true)]
    pub database_password: String,
    #[arg(long, env = "DATABASE_HOST", default_value = "localhost")]
    pub database_host: String,
    #[arg(long, env = "DATABASE_PORT", default_value = "3306")]
    pub database_port: String,
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,
}

impl DatabaseArgs {
    #[must_use]
    pub fn to_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            driver: self.database_driver.clone(),
            name: self.database_name.clone(),
            username: self.database_username.clone(),
            password: self.database_password.clone(),
            host: self.database_host.clone(),
            port: self.database_port.clone(),
            max_connections: self.database_max_connections,
            ..DatabaseConfig::default()
        }
    }
}

/// `roster-server` flags.
#[derive(Debug, Clone, Parser)]
#[command(name = "roster-server", version, about = "Record service over RPC and HTTP/JSON")]
pub struct ServerArgs {
    /// RPC listen address; `:port` binds every interface.
    #[arg(long, env = "GRPC_ADDR", default_value = ":6565")]
    pub grpc_addr: String,
    /// HTTP gateway listen address; `:port` binds every interface.
    #[arg(long, env = "HTTP_ADDR", default_value = ":8080")]
    pub http_addr: String,
    /// Storage backend.
    #[arg(long, env = "STORE_BACKEND", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,
    /// Deadline for each store transaction or read, in seconds.
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = 10)]
    pub store_timeout_secs: u64,
    /// Deadline for each HTTP request, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    #[command(flatten)]
    pub database: DatabaseArgs,
}

impl ServerArgs {
    /// Resolves listen addresses and assembles the runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an address cannot be resolved or the
    /// timeouts are inconsistent.
    pub fn to_config(&self) -> Result<ServerConfig, ConfigError> {
        let config = ServerConfig {
            network: NetworkConfig {
                rpc_addr: parse_listen_addr(&self.grpc_addr)?,
                http_addr: parse_listen_addr(&self.http_addr)?,
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                ..NetworkConfig::default()
            },
            store: StoreConfig {
                kind: self.store,
                operation_timeout: Duration::from_secs(self.store_timeout_secs),
                database: self.database.to_config(),
            },
            profile: ApiProfile::for_store(self.store),
        };
        config.validate()?;
        Ok(config)
    }
}

/// `roster-migrate` flags.
#[derive(Debug, Clone, Parser)]
#[command(name = "roster-migrate", version, about = "Apply pending schema migrations")]
pub struct MigrateArgs {
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub store: StoreConfig,
    pub profile: ApiProfile,
}

impl ServerConfig {
    /// Checks settings that constrain each other.
    ///
    /// An HTTP request must outlive the store deadline, so a stalled store
    /// surfaces as the service's own error instead of a bare 408.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TimeoutOrder` when it does not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let request = self.network.request_timeout;
        let store = self.store.operation_timeout;
        if request <= store {
            return Err(ConfigError::TimeoutOrder { request, store });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address {addr:?}: {reason}")]
    InvalidAddr { addr: String, reason: String },
    #[error("request timeout {request:?} must exceed the store deadline {store:?}")]
    TimeoutOrder { request: Duration, store: Duration },
}

/// Parses a listen address. A bare `:port` means all IPv4 interfaces.
///
/// # Errors
///
/// Returns `ConfigError::InvalidAddr` when the address does not resolve.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    };
    let invalid = |reason: String| ConfigError::InvalidAddr {
        addr: addr.to_string(),
        reason,
    };
    full.to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no addresses resolved".to_string()))
}
