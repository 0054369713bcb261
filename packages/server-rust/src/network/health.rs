//! Process health state and in-flight call tracking.
//!
//! `ArcSwap` holds the current state so probes read it without locking; an
//! atomic counter with RAII guards counts calls still being served.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

/// Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Listeners bound, not yet serving.
    Starting,
    /// Serving traffic.
    Ready,
    /// Interrupted; finishing in-flight calls.
    Draining,
    /// All listeners have returned.
    Stopped,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

/// Shared view of server health, read by probes and updated by the lifecycle.
#[derive(Debug)]
pub struct HealthMonitor {
    state: ArcSwap<HealthState>,
    in_flight: Arc<AtomicU64>,
}

impl HealthMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(HealthState::Starting),
            in_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn set_ready(&self) {
        self.state.store(Arc::new(HealthState::Ready));
    }

    /// Moves to `Draining` unless already stopped.
    pub fn begin_draining(&self) {
        self.state.rcu(|current| match **current {
            HealthState::Stopped => Arc::clone(current),
            _ => Arc::new(HealthState::Draining),
        });
    }

    pub fn set_stopped(&self) {
        self.state.store(Arc::new(HealthState::Stopped));
    }

    #[must_use]
    pub fn state(&self) -> HealthState {
        **self.state.load()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == HealthState::Ready
    }

    /// Counts one call as in flight until the guard drops.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits until no calls are in flight or `timeout` passes.
    ///
    /// Returns `false` on timeout.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.in_flight_count() == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter on drop, including during unwinding.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_lifecycle() {
        let health = HealthMonitor::new();
        assert_eq!(health.state(), HealthState::Starting);
        assert!(!health.is_ready());

        health.set_ready();
        assert!(health.is_ready());

        health.begin_draining();
        assert_eq!(health.state(), HealthState::Draining);

        health.set_stopped();
        assert_eq!(health.state(), HealthState::Stopped);
    }

    #[test]
    fn draining_does_not_revive_stopped() {
        let health = HealthMonitor::new();
        health.set_stopped();
        health.begin_draining();
        assert_eq!(health.state(), HealthState::Stopped);
    }

    #[test]
    fn in_flight_guard_counts() {
        let health = HealthMonitor::new();
        let a = health.in_flight_guard();
        let b = health.in_flight_guard();
        assert_eq!(health.in_flight_count(), 2);
        drop(a);
        assert_eq!(health.in_flight_count(), 1);
        drop(b);
        assert_eq!(health.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn wait_for_drain_sees_released_guard() {
        let health = Arc::new(HealthMonitor::new());
        let guard = health.in_flight_guard();

        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            drop(guard);
        });

        assert!(health.wait_for_drain(Duration::from_secs(2)).await);
        releaser.await.unwrap();
    }

    #[tokio::test]
    async fn wait_for_drain_times_out() {
        let health = HealthMonitor::new();
        let _guard = health.in_flight_guard();
        assert!(!health.wait_for_drain(Duration::from_millis(30)).await);
    }
}
