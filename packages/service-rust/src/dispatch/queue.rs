//! Serial execution queue.
//!
//! Provides a generic `ExecutionQueue<R>` that drains tasks from an unbounded
//! mpsc channel on a single tokio task, handing them to a `QueueRunnable` one
//! at a time in submission order.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

// ---------------------------------------------------------------------------
// QueueRunnable trait
// ---------------------------------------------------------------------------

/// Trait for task handlers executed by `ExecutionQueue`.
///
/// `run` is awaited to completion before the next task is taken, so at most
/// one task is inside `run` at any instant.
#[async_trait]
pub trait QueueRunnable: Send + 'static {
    /// The type of task this runnable processes.
    type Task: Send + 'static;

    /// Process a single task.
    async fn run(&mut self, task: Self::Task);

    /// Called for each task still queued when the queue is stopped.
    /// Default drops the task.
    async fn discard(&mut self, _task: Self::Task) {}

    /// Called once when the queue is shutting down. Default is a no-op.
    async fn shutdown(&mut self) {}
}

// ---------------------------------------------------------------------------
// QueueError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("execution queue channel closed")]
    Closed,
    #[error("execution queue not running")]
    NotRunning,
}

// ---------------------------------------------------------------------------
// ExecutionQueue
// ---------------------------------------------------------------------------

/// Single-worker FIFO queue.
///
/// The queue spawns a tokio task that:
/// 1. Receives tasks from the channel in submission order
/// 2. Awaits `QueueRunnable::run()` for each one before taking the next
/// 3. On stop, hands every task that never started to `QueueRunnable::discard()`
/// 4. Calls `QueueRunnable::shutdown()` last
pub struct ExecutionQueue<R: QueueRunnable> {
    tx: Option<mpsc::UnboundedSender<R::Task>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl<R: QueueRunnable> ExecutionQueue<R> {
    /// Start the worker with the given runnable. Must be called from within a
    /// tokio runtime.
    pub fn start(mut runnable: R) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<R::Task>();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => break,
                    task = rx.recv() => {
                        match task {
                            Some(t) => runnable.run(t).await,
                            None => break, // Channel closed.
                        }
                    }
                }
            }

            rx.close();
            while let Ok(task) = rx.try_recv() {
                runnable.discard(task).await;
            }
            runnable.shutdown().await;
        });

        Self {
            tx: Some(tx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Enqueue a task. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue has been stopped or its worker is gone.
    pub fn submit(&self, task: R::Task) -> Result<(), QueueError> {
        match &self.tx {
            Some(tx) => tx.send(task).map_err(|_| QueueError::Closed),
            None => Err(QueueError::NotRunning),
        }
    }

    /// Stop the worker: the running task (if any) completes, queued tasks are
    /// discarded, and this waits for the worker to exit.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "execution queue worker terminated abnormally");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Probe {
        started: Mutex<Vec<u32>>,
        finished: Mutex<Vec<u32>>,
        discarded: Mutex<Vec<u32>>,
        active: AtomicBool,
        overlaps: AtomicU32,
        shutdown_called: AtomicU32,
    }

    struct RecordingRunnable {
        probe: Arc<Probe>,
        work: Duration,
    }

    #[async_trait]
    impl QueueRunnable for RecordingRunnable {
        type Task = u32;

        async fn run(&mut self, task: u32) {
            if self.probe.active.swap(true, Ordering::SeqCst) {
                self.probe.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            self.probe.started.lock().push(task);
            tokio::time::sleep(self.work).await;
            self.probe.finished.lock().push(task);
            self.probe.active.store(false, Ordering::SeqCst);
        }

        async fn discard(&mut self, task: u32) {
            self.probe.discarded.lock().push(task);
        }

        async fn shutdown(&mut self) {
            self.probe.shutdown_called.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_tasks_one_at_a_time_in_submission_order() {
        let probe = Arc::new(Probe::default());
        let mut queue = ExecutionQueue::start(RecordingRunnable {
            probe: probe.clone(),
            work: Duration::from_millis(10),
        });

        for task in 0..8 {
            queue.submit(task).unwrap();
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        queue.stop().await;

        let expected: Vec<u32> = (0..8).collect();
        assert_eq!(*probe.started.lock(), expected);
        assert_eq!(*probe.finished.lock(), expected);
        assert_eq!(probe.overlaps.load(Ordering::SeqCst), 0);
        assert!(probe.discarded.lock().is_empty());
        assert_eq!(probe.shutdown_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_finishes_running_task_and_discards_the_rest() {
        let probe = Arc::new(Probe::default());
        let mut queue = ExecutionQueue::start(RecordingRunnable {
            probe: probe.clone(),
            work: Duration::from_millis(50),
        });

        for task in 0..4 {
            queue.submit(task).unwrap();
        }
        // Let the worker pick up the first task.
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.stop().await;

        assert_eq!(*probe.started.lock(), vec![0]);
        assert_eq!(*probe.finished.lock(), vec![0]);
        assert_eq!(*probe.discarded.lock(), vec![1, 2, 3]);
        assert_eq!(probe.shutdown_called.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_after_stop_returns_error() {
        let mut queue = ExecutionQueue::start(RecordingRunnable {
            probe: Arc::new(Probe::default()),
            work: Duration::ZERO,
        });
        queue.stop().await;

        let result = queue.submit(1);
        assert!(matches!(result, Err(QueueError::NotRunning)));
    }
}
