//! Server assembly: store, service, listeners, and the lifecycle group.
//!
//! [`Server::bind`] does everything that can fail before serving (opening
//! the store, binding both ports), so configuration and port errors are
//! reported before any actor runs. [`Server::run`] adds the RPC and HTTP
//! actors to a caller-supplied group and runs it to completion.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::lifecycle::{interrupt_channel, GroupError, LifecycleGroup};
use crate::network::{AppState, HealthMonitor, HttpGateway, RpcServer};
use crate::service::RecordService;
use crate::storage::{open_store, RecordStore};

/// Bound listeners plus the shared state behind them.
pub struct Server {
    rpc: RpcServer,
    http: HttpGateway,
    service: Arc<RecordService>,
    health: Arc<HealthMonitor>,
}

impl Server {
    /// Opens the configured store and binds both listeners.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is inconsistent or if the store or either
    /// listener cannot be set up.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let store = open_store(&config.store).await?;
        Self::bind_with_store(config, store).await
    }

    /// Binds both listeners over an already-open store.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is inconsistent or either address cannot
    /// be bound.
    pub async fn bind_with_store(
        config: &ServerConfig,
        store: Arc<dyn RecordStore>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        info!(profile = ?config.profile, "record service configured");
        let service = Arc::new(RecordService::new(store, config.profile));
        let health = Arc::new(HealthMonitor::new());

        let rpc =
            RpcServer::bind(&config.network, Arc::clone(&service), Arc::clone(&health)).await?;
        let http = HttpGateway::bind(
            &config.network,
            AppState::new(Arc::clone(&service), Arc::clone(&health)),
        )
        .await?;

        Ok(Self {
            rpc,
            http,
            service,
            health,
        })
    }

    #[must_use]
    pub fn rpc_addr(&self) -> SocketAddr {
        self.rpc.local_addr()
    }

    #[must_use]
    pub fn http_addr(&self) -> SocketAddr {
        self.http.local_addr()
    }

    #[must_use]
    pub fn health(&self) -> Arc<HealthMonitor> {
        Arc::clone(&self.health)
    }

    /// Runs the RPC and HTTP listeners inside `group` alongside whatever
    /// actors the caller already added (signal handling, test triggers).
    ///
    /// Returns once every actor has returned; the store is closed last.
    ///
    /// # Errors
    ///
    /// Returns the error of the first actor to exit, if it failed.
    pub async fn run(self, mut group: LifecycleGroup) -> Result<(), GroupError> {
        let Self {
            rpc,
            http,
            service,
            health,
        } = self;

        let (stop_rpc, rpc_stopped) = interrupt_channel();
        let draining = Arc::clone(&health);
        group.add("rpc", rpc.serve(rpc_stopped), move || {
            draining.begin_draining();
            stop_rpc();
        });

        let (stop_http, http_stopped) = interrupt_channel();
        let draining = Arc::clone(&health);
        group.add("http", http.serve(http_stopped), move || {
            draining.begin_draining();
            stop_http();
        });

        health.set_ready();
        info!(actors = group.len(), "server ready");
        let result = group.run().await;

        health.set_stopped();
        service.store().close().await;
        info!("server stopped");
        result
    }
}
