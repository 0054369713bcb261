//! Actor lifecycle: the run group, signal handling, and interrupt plumbing.

pub mod group;
pub mod signals;

pub use group::{GroupError, LifecycleGroup};
pub use signals::{signal_actor, SignalReceived};

use std::future::Future;

use tokio::sync::oneshot;

/// An interrupt closure paired with the future it resolves.
///
/// The future completes once the closure runs or is dropped, so a listener
/// handed the future never outlives its interrupt.
pub fn interrupt_channel() -> (
    impl FnOnce() + Send + 'static,
    impl Future<Output = ()> + Send + 'static,
) {
    let (tx, rx) = oneshot::channel::<()>();
    let interrupt = move || {
        let _ = tx.send(());
    };
    let stopped = async move {
        let _ = rx.await;
    };
    (interrupt, stopped)
}
