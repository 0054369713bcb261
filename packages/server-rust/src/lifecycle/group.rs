//! First-exit-wins coordination of long-running actors.
//!
//! A [`LifecycleGroup`] runs every registered actor concurrently. When the
//! first one returns, for any reason, every actor's interrupt is invoked
//! exactly once and the group waits for the rest to return. The first
//! actor's outcome is the group's outcome; later errors are only logged.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

type RunFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;
type Interrupt = Box<dyn FnOnce() + Send + 'static>;

struct Actor {
    name: String,
    run: RunFuture,
    interrupt: Interrupt,
}

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("actor {name} failed: {source:#}")]
    Actor { name: String, source: anyhow::Error },
    #[error("actor {name} panicked")]
    Panicked { name: String },
    #[error("actor task was cancelled")]
    Cancelled(#[source] JoinError),
}

impl GroupError {
    /// Name of the actor whose exit ended the group, when known.
    #[must_use]
    pub fn actor_name(&self) -> Option<&str> {
        match self {
            Self::Actor { name, .. } | Self::Panicked { name } => Some(name),
            Self::Cancelled(_) => None,
        }
    }
}

/// A set of (run, interrupt) pairs that live and die together.
#[derive(Default)]
pub struct LifecycleGroup {
    actors: Vec<Actor>,
}

impl LifecycleGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an actor.
    ///
    /// `interrupt` must make `run` return promptly, and must do so even when
    /// it is invoked before `run` has been polled or after `run` returned.
    pub fn add<F, I>(&mut self, name: impl Into<String>, run: F, interrupt: I) -> &mut Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
        I: FnOnce() + Send + 'static,
    {
        self.actors.push(Actor {
            name: name.into(),
            run: Box::pin(run),
            interrupt: Box::new(interrupt),
        });
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Runs all actors until every one has returned.
    ///
    /// An empty group returns `Ok(())` immediately. Must be called inside a
    /// tokio runtime. Actors are owned by the returned future: dropping it
    /// aborts every actor still running.
    ///
    /// # Errors
    ///
    /// Returns the first-exiting actor's error, or `Panicked` if it panicked.
    pub async fn run(self) -> Result<(), GroupError> {
        if self.actors.is_empty() {
            return Ok(());
        }

        let mut names = HashMap::with_capacity(self.actors.len());
        let mut interrupts = Vec::with_capacity(self.actors.len());
        let mut tasks = JoinSet::new();

        for actor in self.actors {
            debug!(actor = %actor.name, "starting actor");
            let id = tasks.spawn(actor.run).id();
            names.insert(id, actor.name);
            interrupts.push(actor.interrupt);
        }

        let first = match tasks.join_next_with_id().await {
            Some(joined) => outcome(&names, joined),
            None => return Ok(()),
        };
        match &first {
            Ok(()) => info!("actor exited, interrupting group"),
            Err(e) => warn!(error = %e, "actor failed, interrupting group"),
        }

        for interrupt in interrupts {
            interrupt();
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            if let Err(e) = outcome(&names, joined) {
                debug!(error = %e, "actor returned an error after interrupt");
            }
        }

        first
    }
}

fn outcome(
    names: &HashMap<task::Id, String>,
    joined: Result<(task::Id, anyhow::Result<()>), JoinError>,
) -> Result<(), GroupError> {
    let name_of = |id: task::Id| names.get(&id).cloned().unwrap_or_default();
    match joined {
        Ok((id, Ok(()))) => {
            info!(actor = %name_of(id), "actor returned");
            Ok(())
        }
        Ok((id, Err(source))) => Err(GroupError::Actor {
            name: name_of(id),
            source,
        }),
        Err(e) if e.is_panic() => {
            let name = name_of(e.id());
            error!(actor = %name, "actor panicked");
            Err(GroupError::Panicked { name })
        }
        Err(e) => Err(GroupError::Cancelled(e)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    /// An actor that blocks until interrupted, counting interrupts. The flag
    /// is set once its run future has returned.
    fn blocking_actor(
        counter: &Arc<AtomicUsize>,
    ) -> (
        impl Future<Output = anyhow::Result<()>> + Send + 'static,
        impl FnOnce() + Send + 'static,
        Arc<AtomicBool>,
    ) {
        let (tx, rx) = oneshot::channel::<()>();
        let counter = Arc::clone(counter);
        let returned = Arc::new(AtomicBool::new(false));
        let returned_flag = Arc::clone(&returned);
        let run = async move {
            let _ = rx.await;
            tokio::task::yield_now().await;
            returned_flag.store(true, Ordering::SeqCst);
            Ok(())
        };
        let interrupt = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        };
        (run, interrupt, returned)
    }

    #[tokio::test]
    async fn empty_group_returns_ok() {
        assert!(LifecycleGroup::new().run().await.is_ok());
    }

    #[tokio::test]
    async fn first_clean_exit_interrupts_everyone_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut group = LifecycleGroup::new();

        let first_interrupts = Arc::clone(&counter);
        group.add(
            "timer",
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            },
            move || {
                first_interrupts.fetch_add(1, Ordering::SeqCst);
            },
        );
        let (run, interrupt, _) = blocking_actor(&counter);
        group.add("b", run, interrupt);
        let (run, interrupt, _) = blocking_actor(&counter);
        group.add("c", run, interrupt);
        assert_eq!(group.len(), 3);

        tokio::time::timeout(Duration::from_secs(5), group.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failing_actor_interrupts_blocked_peers() {
        let blocked = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let mut group = LifecycleGroup::new();

        let (run, interrupt, a_returned) = blocking_actor(&blocked);
        group.add("a", run, interrupt);
        let failed_interrupts = Arc::clone(&failed);
        group.add(
            "b",
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                anyhow::bail!("listener died")
            },
            move || {
                failed_interrupts.fetch_add(1, Ordering::SeqCst);
            },
        );
        let (run, interrupt, c_returned) = blocking_actor(&blocked);
        group.add("c", run, interrupt);

        let err = tokio::time::timeout(Duration::from_secs(5), group.run())
            .await
            .unwrap()
            .unwrap_err();
        assert!(a_returned.load(Ordering::SeqCst));
        assert!(c_returned.load(Ordering::SeqCst));
        assert_eq!(err.actor_name(), Some("b"));
        assert!(err.to_string().contains("listener died"));
        assert_eq!(blocked.load(Ordering::SeqCst), 2);
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_after_interrupt_are_not_reported() {
        let mut group = LifecycleGroup::new();
        group.add(
            "done",
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            },
            || {},
        );

        let (tx, rx) = oneshot::channel::<()>();
        group.add(
            "grumpy",
            async move {
                let _ = rx.await;
                anyhow::bail!("interrupted rudely")
            },
            move || {
                let _ = tx.send(());
            },
        );

        assert!(group.run().await.is_ok());
    }

    #[tokio::test]
    async fn panicking_actor_is_reported_and_others_stop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut group = LifecycleGroup::new();
        group.add(
            "boom",
            async {
                if true {
                    panic!("actor blew up");
                }
                Ok(())
            },
            || {},
        );
        let (run, interrupt, _) = blocking_actor(&counter);
        group.add("bystander", run, interrupt);

        let err = group.run().await.unwrap_err();
        assert!(matches!(err, GroupError::Panicked { ref name } if name == "boom"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn interrupt_before_poll_still_stops_actor() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut group = LifecycleGroup::new();
        group.add("instant", async { Ok(()) }, || {});
        for name in ["a", "b", "c", "d"] {
            let (run, interrupt, _) = blocking_actor(&counter);
            group.add(name, run, interrupt);
        }

        tokio::time::timeout(Duration::from_secs(5), group.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn dropping_run_aborts_actors() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut group = LifecycleGroup::new();
        let ticking = Arc::clone(&ticks);
        group.add(
            "ticker",
            async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    if ticking.fetch_add(1, Ordering::SeqCst) == usize::MAX {
                        break Ok(());
                    }
                }
            },
            || {},
        );

        let dropped = tokio::time::timeout(Duration::from_millis(50), group.run()).await;
        assert!(dropped.is_err());
        let seen = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }
}
