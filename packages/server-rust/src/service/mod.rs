//! Record business operations shared by the RPC and HTTP adapters.
//!
//! [`RecordService`] is the only place where [`StoreError`] values are turned
//! into transport-visible [`RpcStatus`] codes.

use std::sync::Arc;

use roster_core::messages::{
    CreateRecordRequest, CreateRecordResponse, GetRecordRequest, GetRecordResponse,
    ListRecordsRequest, ListRecordsResponse, RpcRequest, RpcResponse,
};
use roster_core::RpcStatus;
use tracing::{debug, error};

use crate::config::StoreKind;
use crate::storage::{RecordStore, StoreError};

/// Method set exposed by a deployment.
///
/// The durable deployment lists records; the in-memory deployment looks them
/// up by id. Both accept `CreateRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiProfile {
    Durable,
    #[default]
    Memory,
}

impl ApiProfile {
    /// Profile matching the configured store.
    #[must_use]
    pub fn for_store(kind: StoreKind) -> Self {
        match kind {
            StoreKind::Sql => Self::Durable,
            StoreKind::Memory => Self::Memory,
        }
    }

    #[must_use]
    pub fn supports(self, request: &RpcRequest) -> bool {
        matches!(
            (self, request),
            (_, RpcRequest::CreateRecord(_))
                | (Self::Durable, RpcRequest::ListRecords(_))
                | (Self::Memory, RpcRequest::GetRecord(_))
        )
    }
}

/// Implements the record RPC methods on top of a [`RecordStore`].
///
/// Cheap to share behind an `Arc`; every method takes `&self` and is safe to
/// call concurrently.
pub struct RecordService {
    store: Arc<dyn RecordStore>,
    profile: ApiProfile,
}

impl RecordService {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, profile: ApiProfile) -> Self {
        Self { store, profile }
    }

    #[must_use]
    pub fn profile(&self) -> ApiProfile {
        self.profile
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Routes a decoded request to its handler.
    ///
    /// # Errors
    ///
    /// Returns `Unimplemented` for methods outside the active profile, or the
    /// handler's status on failure.
    pub async fn dispatch(&self, request: RpcRequest) -> Result<RpcResponse, RpcStatus> {
        if !self.profile.supports(&request) {
            return Err(RpcStatus::unimplemented(format!(
                "method {} is not served by the {:?} profile",
                request.method(),
                self.profile
            )));
        }
        match request {
            RpcRequest::CreateRecord(req) => {
                self.create_record(req).await.map(RpcResponse::CreateRecord)
            }
            RpcRequest::ListRecords(req) => {
                self.list_records(req).await.map(RpcResponse::ListRecords)
            }
            RpcRequest::GetRecord(req) => self.get_record(req).await.map(RpcResponse::GetRecord),
        }
    }

    /// # Errors
    ///
    /// `InvalidArgument` when `record` is absent (nothing is written);
    /// `Internal` when the store rejects the write.
    pub async fn create_record(
        &self,
        req: CreateRecordRequest,
    ) -> Result<CreateRecordResponse, RpcStatus> {
        let Some(draft) = req.record else {
            return Err(RpcStatus::invalid_argument("record required"));
        };
        match self.store.insert(draft).await {
            Ok(id) => {
                debug!(%id, "record created");
                Ok(CreateRecordResponse { id })
            }
            Err(e) => {
                error!(error = %e, "create record failed");
                Err(RpcStatus::internal(e.to_string()))
            }
        }
    }

    /// # Errors
    ///
    /// `NotFound` when the store read fails. An empty store is not an error.
    pub async fn list_records(
        &self,
        _req: ListRecordsRequest,
    ) -> Result<ListRecordsResponse, RpcStatus> {
        match self.store.fetch_all().await {
            Ok(records) => Ok(ListRecordsResponse { records }),
            Err(e) => {
                error!(error = %e, "list records failed");
                Err(RpcStatus::not_found(format!("records not found: {e}")))
            }
        }
    }

    /// # Errors
    ///
    /// `InvalidArgument` for an empty id, `NotFound` for an unknown id,
    /// `Internal` for any other store failure.
    pub async fn get_record(&self, req: GetRecordRequest) -> Result<GetRecordResponse, RpcStatus> {
        if req.id.is_empty() {
            return Err(RpcStatus::invalid_argument("id required"));
        }
        match self.store.fetch_by_id(&req.id).await {
            Ok(record) => Ok(GetRecordResponse { record }),
            Err(StoreError::NotFound { id }) => Err(RpcStatus::not_found(format!(
                "record not found by id {id}"
            ))),
            Err(e) => {
                error!(error = %e, id = %req.id, "get record failed");
                Err(RpcStatus::internal(e.to_string()))
            }
        }
    }
}
