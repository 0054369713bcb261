//! Client for the binary RPC protocol.

use std::net::SocketAddr;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use roster_core::codec;
use roster_core::messages::{
    CreateRecordRequest, CreateRecordResponse, GetRecordRequest, GetRecordResponse,
    ListRecordsRequest, ListRecordsResponse, RequestFrame, ResponseFrame, RpcRequest, RpcResponse,
};
use roster_core::{CodecError, RecordDraft, RpcStatus};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::config::DEFAULT_MAX_FRAME_LENGTH;
use super::rpc_server::frame_codec;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("connection closed by server")]
    Closed,
    #[error("reply for call {got} while waiting for call {expected}")]
    CallIdMismatch { expected: u64, got: u64 },
    #[error("{method} answered with a different method's response")]
    UnexpectedResponse { method: &'static str },
    #[error(transparent)]
    Status(#[from] RpcStatus),
}

impl ClientError {
    /// The server-side status, if the call reached the service.
    #[must_use]
    pub fn status(&self) -> Option<&RpcStatus> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// A single RPC connection. Calls are sent one at a time.
pub struct RpcClient {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    next_call_id: u64,
}

impl RpcClient {
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the TCP connection fails.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, frame_codec(DEFAULT_MAX_FRAME_LENGTH)),
            next_call_id: 1,
        })
    }

    /// Sends one request and waits for its reply.
    ///
    /// # Errors
    ///
    /// Transport failures, or `ClientError::Status` when the service
    /// answered with an error.
    pub async fn call(&mut self, request: RpcRequest) -> Result<RpcResponse, ClientError> {
        let call_id = self.next_call_id;
        self.next_call_id += 1;

        let frame = codec::encode(&RequestFrame { call_id, request })?;
        self.send_raw(frame).await?;

        let reply = self.recv().await?;
        if reply.call_id != call_id {
            return Err(ClientError::CallIdMismatch {
                expected: call_id,
                got: reply.call_id,
            });
        }
        Ok(reply.outcome.into_result()?)
    }

    /// Writes an arbitrary frame body. Exposed for protocol tests.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the write fails.
    pub async fn send_raw(&mut self, body: Vec<u8>) -> Result<(), ClientError> {
        self.framed.send(Bytes::from(body)).await?;
        Ok(())
    }

    /// Reads the next reply frame.
    ///
    /// # Errors
    ///
    /// `Closed` at end of stream, `Io` or `Codec` on a bad frame.
    pub async fn recv(&mut self) -> Result<ResponseFrame, ClientError> {
        let bytes = self.framed.next().await.ok_or(ClientError::Closed)??;
        Ok(codec::decode(&bytes)?)
    }

    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn create_record(
        &mut self,
        draft: RecordDraft,
    ) -> Result<CreateRecordResponse, ClientError> {
        match self
            .call(RpcRequest::CreateRecord(CreateRecordRequest::new(draft)))
            .await?
        {
            RpcResponse::CreateRecord(resp) => Ok(resp),
            _ => Err(ClientError::UnexpectedResponse {
                method: "CreateRecord",
            }),
        }
    }

    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn list_records(&mut self) -> Result<ListRecordsResponse, ClientError> {
        match self
            .call(RpcRequest::ListRecords(ListRecordsRequest {}))
            .await?
        {
            RpcResponse::ListRecords(resp) => Ok(resp),
            _ => Err(ClientError::UnexpectedResponse {
                method: "ListRecords",
            }),
        }
    }

    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn get_record(
        &mut self,
        id: impl Into<String>,
    ) -> Result<GetRecordResponse, ClientError> {
        match self
            .call(RpcRequest::GetRecord(GetRecordRequest { id: id.into() }))
            .await?
        {
            RpcResponse::GetRecord(resp) => Ok(resp),
            _ => Err(ClientError::UnexpectedResponse {
                method: "GetRecord",
            }),
        }
    }
}
