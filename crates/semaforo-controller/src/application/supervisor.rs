//! Supervised background tasks.
//!
//! Connection handlers and sequence runs are started without the caller
//! waiting for them.  Instead of a bare `tokio::spawn` whose result nobody
//! looks at, they go through a [`TaskSupervisor`]: a reaper task owns a
//! `JoinSet`, spawns every submitted future into it and logs how each one
//! ended.  An `Err` is logged as a warning, a panic as an error; neither
//! affects any other task.
//!
//! ```text
//! supervisor.spawn("conn 10.0.0.7:40000", fut)
//!        │  (unbounded channel)
//!        ▼
//!   reaper task ── JoinSet ── join_next() ──► warn!/error! on failure
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, warn};

type BoxedTask = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

struct Submission {
    name: String,
    task: BoxedTask,
}

/// Handle used to submit tasks.  Cheap to clone.
#[derive(Clone)]
pub struct TaskSupervisor {
    tx: mpsc::UnboundedSender<Submission>,
    live: Arc<AtomicUsize>,
}

impl TaskSupervisor {
    /// Starts the reaper task and returns the handle plus the reaper's join
    /// handle.  The reaper exits once every `TaskSupervisor` clone has been
    /// dropped and all submitted tasks have finished.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let live = Arc::new(AtomicUsize::new(0));
        let reaper = tokio::spawn(reap(rx, Arc::clone(&live)));
        (Self { tx, live }, reaper)
    }

    /// Submits `task` to run in the background under `name`.
    pub fn spawn<F>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        self.live.fetch_add(1, Ordering::SeqCst);
        let submission = Submission {
            name,
            task: Box::pin(task),
        };
        if let Err(rejected) = self.tx.send(submission) {
            self.live.fetch_sub(1, Ordering::SeqCst);
            error!("supervisor stopped; dropping task '{}'", rejected.0.name);
        }
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn live_tasks(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

async fn reap(mut rx: mpsc::UnboundedReceiver<Submission>, live: Arc<AtomicUsize>) {
    let mut tasks: JoinSet<(String, anyhow::Result<()>)> = JoinSet::new();

    loop {
        tokio::select! {
            submission = rx.recv() => match submission {
                Some(Submission { name, task }) => {
                    debug!("supervisor: starting task '{name}'");
                    tasks.spawn(async move { (name, task.await) });
                }
                None => break,
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                report(joined, &live);
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        report(joined, &live);
    }
}

fn report(joined: Result<(String, anyhow::Result<()>), JoinError>, live: &AtomicUsize) {
    live.fetch_sub(1, Ordering::SeqCst);
    match joined {
        Ok((name, Ok(()))) => debug!("supervisor: task '{name}' finished"),
        Ok((name, Err(e))) => warn!("supervisor: task '{name}' failed: {e:#}"),
        Err(e) if e.is_panic() => error!("supervisor: task panicked: {e}"),
        Err(e) => debug!("supervisor: task cancelled: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_spawned_task_runs_and_live_count_returns_to_zero() {
        // Arrange
        let (supervisor, _reaper) = TaskSupervisor::start();
        let (tx, rx) = tokio::sync::oneshot::channel();

        // Act
        supervisor.spawn("send", async move {
            let _ = tx.send(42);
            Ok(())
        });

        // Assert
        assert_eq!(rx.await.unwrap(), 42);
        settle().await;
        assert_eq!(supervisor.live_tasks(), 0);
    }

    #[tokio::test]
    async fn test_failing_and_panicking_tasks_do_not_stop_others() {
        let (supervisor, _reaper) = TaskSupervisor::start();
        supervisor.spawn("fails", async { anyhow::bail!("boom") });
        supervisor.spawn("panics", async { panic!("kaboom") });

        let (tx, rx) = tokio::sync::oneshot::channel();
        supervisor.spawn("healthy", async move {
            let _ = tx.send(());
            Ok(())
        });

        rx.await.unwrap();
        settle().await;
        assert_eq!(supervisor.live_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_count_tracks_running_tasks() {
        let (supervisor, _reaper) = TaskSupervisor::start();
        supervisor.spawn("sleeper", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        });
        settle().await;
        assert_eq!(supervisor.live_tasks(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(supervisor.live_tasks(), 0);
    }

    #[tokio::test]
    async fn test_reaper_exits_after_last_handle_dropped() {
        let (supervisor, reaper) = TaskSupervisor::start();
        supervisor.spawn("quick", async { Ok(()) });
        drop(supervisor);
        tokio::time::timeout(Duration::from_secs(5), reaper)
            .await
            .expect("reaper must exit")
            .unwrap();
    }
}
