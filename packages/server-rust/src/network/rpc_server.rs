//! Binary RPC listener.
//!
//! Frames are length-prefixed MessagePack maps. Each accepted connection is
//! served by its own task; calls on one connection are answered in order.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use roster_core::codec;
use roster_core::messages::{RequestFrame, ResponseFrame};
use roster_core::RpcStatus;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, error, info, warn};

use super::config::NetworkConfig;
use super::health::HealthMonitor;
use crate::service::RecordService;

/// Pause before accepting again after the process ran out of descriptors
/// or socket buffers.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(200);

/// Builds the frame codec used on both ends of an RPC connection.
#[must_use]
pub fn frame_codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec()
}

/// A bound RPC listener.
pub struct RpcServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    service: Arc<RecordService>,
    health: Arc<HealthMonitor>,
    max_frame_length: usize,
    drain_timeout: Duration,
}

impl RpcServer {
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(
        config: &NetworkConfig,
        service: Arc<RecordService>,
        health: Arc<HealthMonitor>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.rpc_addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "RPC listener bound");

        Ok(Self {
            listener,
            local_addr,
            service,
            health,
            max_frame_length: config.max_frame_length,
            drain_timeout: config.drain_timeout,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until `shutdown` resolves, then stops reading new
    /// calls and waits up to the drain timeout for open connections to finish.
    ///
    /// # Errors
    ///
    /// Returns an error when `accept` fails for a reason other than a broken
    /// incoming connection or temporary resource exhaustion.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        info!(addr = %self.local_addr, "serving RPC");
        tokio::pin!(shutdown);

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        let result = loop {
            tokio::select! {
                () = &mut shutdown => break Ok(()),
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            Arc::clone(&self.service),
                            Arc::clone(&self.health),
                            self.max_frame_length,
                            stop_rx.clone(),
                        ));
                    }
                    Err(e) => match classify_accept_error(&e) {
                        AcceptError::Connection => {
                            debug!(error = %e, "connection failed during accept");
                        }
                        AcceptError::Exhausted => {
                            warn!(error = %e, "RPC accept out of resources, backing off");
                            tokio::select! {
                                () = &mut shutdown => break Ok(()),
                                () = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                            }
                        }
                        AcceptError::Fatal => {
                            error!(error = %e, "RPC accept failed");
                            break Err(e.into());
                        }
                    },
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        };

        drop(self.listener);
        let _ = stop_tx.send(true);
        let drain = async { while connections.join_next().await.is_some() {} };
        if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
            warn!(
                remaining = connections.len(),
                "RPC drain timed out, aborting connections"
            );
            connections.abort_all();
        }
        info!("RPC listener stopped");
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptError {
    /// The incoming connection broke; accept the next one.
    Connection,
    /// Out of descriptors or buffers; retry after [`ACCEPT_BACKOFF`].
    Exhausted,
    Fatal,
}

fn classify_accept_error(e: &io::Error) -> AcceptError {
    match e.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => AcceptError::Connection,
        io::ErrorKind::OutOfMemory => AcceptError::Exhausted,
        _ if is_resource_exhaustion(e) => AcceptError::Exhausted,
        _ => AcceptError::Fatal,
    }
}

#[cfg(unix)]
fn is_resource_exhaustion(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(not(unix))]
fn is_resource_exhaustion(_e: &io::Error) -> bool {
    false
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    service: Arc<RecordService>,
    health: Arc<HealthMonitor>,
    max_frame_length: usize,
    mut stop: watch::Receiver<bool>,
) {
    debug!(%peer, "RPC connection opened");
    let mut framed = Framed::new(stream, frame_codec(max_frame_length));

    loop {
        let frame = tokio::select! {
            _ = stop.changed() => break,
            frame = framed.next() => frame,
        };
        let bytes = match frame {
            None => break,
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                warn!(%peer, error = %e, "unreadable RPC frame, closing connection");
                break;
            }
        };

        let reply = {
            let _guard = health.in_flight_guard();
            handle_frame(&service, &bytes).await
        };
        let encoded = match codec::encode(&reply) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(%peer, call_id = reply.call_id, error = %e, "failed to encode reply");
                break;
            }
        };
        if let Err(e) = framed.send(Bytes::from(encoded)).await {
            debug!(%peer, error = %e, "failed to write reply");
            break;
        }
    }
    debug!(%peer, "RPC connection closed");
}

/// Decodes one request frame and runs it through the service.
///
/// An undecodable frame is answered with `InvalidArgument` and call id 0.
pub async fn handle_frame(service: &RecordService, bytes: &[u8]) -> ResponseFrame {
    match codec::decode::<RequestFrame>(bytes) {
        Ok(RequestFrame { call_id, request }) => {
            debug!(call_id, method = request.method(), "RPC call");
            ResponseFrame::new(call_id, service.dispatch(request).await)
        }
        Err(e) => ResponseFrame::new(
            0,
            Err(RpcStatus::invalid_argument(format!(
                "malformed request frame: {e}"
            ))),
        ),
    }
}
