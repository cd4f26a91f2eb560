//! Top-level dispatch entry point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyops_core::{
    CancellationToken, CryptoInput, KeyRepository, OperationEnv, OperationFailure,
    OperationRequest, OperationResult,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::callback::{OperationCallback, OperationOutcome};
use super::config::DispatcherConfig;
use super::handle::OperationHandle;
use super::progress::ProgressChannel;
use super::queue::{ExecutionQueue, QueueRunnable};
use super::registry::OperationRegistry;
use super::DispatchId;

// ---------------------------------------------------------------------------
// DispatchTask
// ---------------------------------------------------------------------------

/// One queued `start` call.
struct DispatchTask {
    id: DispatchId,
    request: OperationRequest,
    crypto_input: CryptoInput,
    token: CancellationToken,
    wait_for_progress_ui: bool,
}

// ---------------------------------------------------------------------------
// DispatchRunner
// ---------------------------------------------------------------------------

/// Worker-side half of the dispatcher: runs one task at a time.
struct DispatchRunner {
    registry: Arc<OperationRegistry>,
    repository: Arc<dyn KeyRepository>,
    channel: ProgressChannel,
    quiescence: Duration,
}

impl DispatchRunner {
    async fn execute(&self, task: DispatchTask) {
        let DispatchTask {
            id,
            request,
            crypto_input,
            token,
            wait_for_progress_ui,
        } = task;

        if wait_for_progress_ui && !self.quiescence.is_zero() {
            #[allow(clippy::cast_possible_truncation)]
            let delay_ms = self.quiescence.as_millis() as u64;
            debug!(delay_ms, "waiting for progress surface");
            tokio::time::sleep(self.quiescence).await;
        }

        if token.is_cancelled() {
            debug!("cancelled before start");
            self.channel.finish(id, OperationOutcome::CancelledBeforeStart);
            return;
        }

        let kind = request.kind();
        let env = OperationEnv {
            repository: Arc::clone(&self.repository),
            progress: Arc::new(self.channel.sink(id)),
            cancellation: kind.is_cancellable().then(|| token.clone()),
        };
        let registry = Arc::clone(&self.registry);

        // Construction and execution share one panic boundary.
        let started = tokio::time::Instant::now();
        let result = match tokio::task::spawn_blocking(move || {
            let mut operation = registry.resolve(kind).create(env);
            operation.execute(request, crypto_input)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "operation panicked");
                OperationResult::failed(
                    kind,
                    OperationFailure::Internal(format!("{kind} operation panicked")),
                )
            }
        };

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            duration_ms,
            outcome = result.outcome_label(),
            "operation complete"
        );

        self.channel.finish(id, OperationOutcome::Completed(result));
    }
}

#[async_trait]
impl QueueRunnable for DispatchRunner {
    type Task = DispatchTask;

    async fn run(&mut self, task: DispatchTask) {
        let span = info_span!(
            "dispatch",
            dispatch_id = task.id.0,
            kind = %task.request.kind(),
        );
        self.execute(task).instrument(span).await;
    }

    async fn discard(&mut self, task: DispatchTask) {
        task.token.cancel();
        debug!(dispatch_id = task.id.0, "dispatcher stopping; queued dispatch dropped");
        self.channel
            .finish(task.id, OperationOutcome::CancelledBeforeStart);
    }
}

// ---------------------------------------------------------------------------
// OperationDispatcher
// ---------------------------------------------------------------------------

/// Runs operations against one shared repository, one at a time.
///
/// `start` never blocks: it registers the callback, queues the request and
/// returns a cancellation handle. A single worker later resolves the request
/// through the [`OperationRegistry`] and executes it on a blocking thread.
/// Progress and the terminal outcome reach the callback through the
/// [`ProgressChannel`], in emission order, with exactly one `finished` call
/// per `start`.
///
/// Every dispatch that touches a given repository must go through the same
/// dispatcher; share it behind an `Arc` rather than creating several.
pub struct OperationDispatcher {
    queue: ExecutionQueue<DispatchRunner>,
    channel: ProgressChannel,
    delivery: JoinHandle<()>,
    registry: Arc<OperationRegistry>,
    next_id: AtomicU64,
}

impl OperationDispatcher {
    /// Create the dispatcher and spawn its worker and delivery tasks.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        registry: OperationRegistry,
        repository: Arc<dyn KeyRepository>,
        config: &DispatcherConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        let (channel, delivery) = ProgressChannel::spawn(config.coalesce_progress);
        let queue = ExecutionQueue::start(DispatchRunner {
            registry: Arc::clone(&registry),
            repository,
            channel: channel.clone(),
            quiescence: config.initial_quiescence_delay,
        });

        Self {
            queue,
            channel,
            delivery,
            registry,
            next_id: AtomicU64::new(1),
        }
    }

    /// Queue `request` for execution and return its cancellation handle.
    ///
    /// # Panics
    ///
    /// Panics if the registry has no factory for the request's kind. The check
    /// runs before anything is queued, so nothing executes and the callback is
    /// never invoked.
    pub fn start<C: OperationCallback>(
        &self,
        request: OperationRequest,
        crypto_input: CryptoInput,
        callback: C,
    ) -> OperationHandle {
        let kind = request.kind();
        assert!(
            self.registry.supports(kind),
            "unrecognized operation request: {kind}"
        );

        let id = DispatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        let wait_for_progress_ui = callback.needs_progress_ui();

        self.channel.attach(id, Box::new(callback));

        let task = DispatchTask {
            id,
            request,
            crypto_input,
            token: token.clone(),
            wait_for_progress_ui,
        };
        match self.queue.submit(task) {
            Ok(()) => debug!(dispatch_id = id.0, kind = %kind, "dispatch queued"),
            Err(e) => {
                warn!(dispatch_id = id.0, kind = %kind, error = %e, "dispatch refused");
                token.cancel();
                self.channel.finish(id, OperationOutcome::CancelledBeforeStart);
            }
        }

        OperationHandle::new(id, token)
    }

    /// Stop the dispatcher.
    ///
    /// The running operation (if any) completes normally. Queued dispatches
    /// that have not started are cancelled and receive `CancelledBeforeStart`.
    /// Returns once every pending signal has been delivered.
    pub async fn shutdown(self) {
        let Self {
            mut queue,
            channel,
            delivery,
            ..
        } = self;

        queue.stop().await;
        drop(channel);
        if let Err(e) = delivery.await {
            error!(error = %e, "progress delivery task terminated abnormally");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
