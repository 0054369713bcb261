//! RPC framing types.
//!
//! Every RPC frame carries a caller-chosen `callId` so replies can be matched
//! to requests. The method discriminant travels in a `method` tag inside the
//! request and response maps.

use serde::{Deserialize, Serialize};

use super::records::{
    CreateRecordRequest, CreateRecordResponse, GetRecordRequest, GetRecordResponse,
    ListRecordsRequest, ListRecordsResponse,
};
use crate::status::RpcStatus;

/// A single RPC method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum RpcRequest {
    CreateRecord(CreateRecordRequest),
    ListRecords(ListRecordsRequest),
    GetRecord(GetRecordRequest),
}

impl RpcRequest {
    /// Wire name of the invoked method.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::CreateRecord(_) => "CreateRecord",
            Self::ListRecords(_) => "ListRecords",
            Self::GetRecord(_) => "GetRecord",
        }
    }
}

/// Successful result of an RPC method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum RpcResponse {
    CreateRecord(CreateRecordResponse),
    ListRecords(ListRecordsResponse),
    GetRecord(GetRecordResponse),
}

/// Client-to-server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFrame {
    pub call_id: u64,
    pub request: RpcRequest,
}

/// Server-to-client frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFrame {
    pub call_id: u64,
    pub outcome: RpcOutcome,
}

impl ResponseFrame {
    #[must_use]
    pub fn new(call_id: u64, result: Result<RpcResponse, RpcStatus>) -> Self {
        Self {
            call_id,
            outcome: result.into(),
        }
    }
}

/// Either a response or an error status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RpcOutcome {
    Ok { response: RpcResponse },
    Error { status: RpcStatus },
}

impl RpcOutcome {
    /// Converts the outcome back into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the carried `RpcStatus` for the `Error` variant.
    pub fn into_result(self) -> Result<RpcResponse, RpcStatus> {
        match self {
            Self::Ok { response } => Ok(response),
            Self::Error { status } => Err(status),
        }
    }
}

impl From<Result<RpcResponse, RpcStatus>> for RpcOutcome {
    fn from(result: Result<RpcResponse, RpcStatus>) -> Self {
        match result {
            Ok(response) => Self::Ok { response },
            Err(status) => Self::Error { status },
        }
    }
}
