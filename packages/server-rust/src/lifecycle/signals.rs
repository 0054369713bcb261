//! OS termination signals as a lifecycle actor.
//!
//! The actor returns [`SignalReceived`] when SIGINT or SIGTERM arrives, which
//! ends the group with an error and makes the binary exit non-zero. When
//! interrupted it returns `Ok(())` and leaves signal handling alone.

use std::future::Future;
use std::io;

use tokio::sync::oneshot;
use tracing::info;

/// The process was asked to terminate.
#[derive(Debug, thiserror::Error)]
#[error("received {signal}")]
pub struct SignalReceived {
    pub signal: &'static str,
}

/// Builds the run future and interrupt for the signal actor.
pub fn signal_actor() -> (
    impl Future<Output = anyhow::Result<()>> + Send + 'static,
    impl FnOnce() + Send + 'static,
) {
    let (tx, rx) = oneshot::channel::<()>();
    let run = async move {
        tokio::select! {
            signal = wait_for_signal() => {
                let signal = signal?;
                info!(signal, "termination signal received");
                Err(anyhow::Error::from(SignalReceived { signal }))
            }
            _ = rx => Ok::<(), anyhow::Error>(()),
        }
    };
    let interrupt = move || {
        let _ = tx.send(());
    };
    (run, interrupt)
}

#[cfg(unix)]
async fn wait_for_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
