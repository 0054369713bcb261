//! Roster server: a record service exposed over binary RPC and an HTTP/JSON
//! gateway, backed by a SQL database or an in-process map.
//!
//! [`app::Server`] wires the pieces together; [`lifecycle::LifecycleGroup`]
//! decides when the process stops.

pub mod app;
pub mod backoff;
pub mod config;
pub mod lifecycle;
pub mod network;
pub mod service;
pub mod storage;
pub mod telemetry;

pub use app::Server;
pub use config::{ServerConfig, StoreConfig, StoreKind};
pub use lifecycle::{GroupError, LifecycleGroup};
pub use service::{ApiProfile, RecordService};
pub use storage::{RecordStore, StoreError};
