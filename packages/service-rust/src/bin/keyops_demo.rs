//! Drives the dispatcher with simulated operations.
//!
//! Every request kind is served by the same stepping operation, which reports
//! progress, honors cancellation when its kind allows it and writes a keyring
//! to the in-memory repository when done.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use keyops_core::{
    CryptoInput, ExecutableOperation, LogLevel, OperationEnv, OperationFailure, OperationKind,
    OperationRequest, OperationResult, Payload, ProgressLabel, StoredKeyring,
};
use keyops_service::telemetry::init_tracing;
use keyops_service::{
    DispatcherConfig, MemoryKeyRepository, OperationCallback, OperationDispatcher,
    OperationOutcome, OperationRegistry,
};
use tokio::sync::oneshot;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "keyops-demo", about = "Run simulated operations through the dispatcher")]
struct Cli {
    /// Number of requests to submit (kinds are assigned round-robin).
    #[arg(long, default_value_t = 6)]
    count: usize,

    /// Progress steps each simulated operation performs.
    #[arg(long, default_value_t = 5)]
    steps: u32,

    /// Milliseconds each step takes.
    #[arg(long, default_value_t = 20)]
    step_ms: u64,

    /// Quiescence window in milliseconds for callers with a progress UI.
    #[arg(long, env = "KEYOPS_QUIESCENCE_MS", default_value_t = 200)]
    quiescence_ms: u64,

    /// Coalesce progress updates when delivery falls behind.
    #[arg(long, env = "KEYOPS_COALESCE_PROGRESS")]
    coalesce: bool,

    /// Cancel every Nth request right after submitting it (0 disables).
    #[arg(long, default_value_t = 0)]
    cancel_every: usize,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

// ---------------------------------------------------------------------------
// SteppingOperation
// ---------------------------------------------------------------------------

struct SteppingOperation {
    env: OperationEnv,
    steps: u32,
    step: Duration,
}

impl ExecutableOperation for SteppingOperation {
    fn execute(&mut self, request: OperationRequest, _input: CryptoInput) -> OperationResult {
        let kind = request.kind();
        let label = Some(ProgressLabel("progress.working"));

        for current in 0..self.steps {
            if self.env.is_cancelled() {
                return OperationResult::cancelled(kind)
                    .with_log(LogLevel::Info, format!("stopped after {current} steps"));
            }
            self.env.progress.set_progress(label, current, self.steps);
            std::thread::sleep(self.step);
        }

        self.env.progress.set_prevent_cancel();
        let master_key_id = request
            .payload()
            .data
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        let keyring = StoredKeyring {
            data: kind.as_str().as_bytes().to_vec(),
        };
        if let Err(e) = self.env.repository.save(master_key_id, keyring) {
            return OperationResult::failed(kind, OperationFailure::Repository(e.to_string()));
        }
        self.env.progress.set_progress(label, self.steps, self.steps);

        OperationResult::ok(kind).with_log(LogLevel::Info, format!("saved {master_key_id:#x}"))
    }
}

// ---------------------------------------------------------------------------
// LoggingCallback
// ---------------------------------------------------------------------------

struct LoggingCallback {
    index: usize,
    done: Option<oneshot::Sender<OperationOutcome>>,
}

impl OperationCallback for LoggingCallback {
    fn needs_progress_ui(&self) -> bool {
        true
    }

    fn progress(&mut self, label: Option<ProgressLabel>, current: u32, total: u32) {
        info!(
            request = self.index,
            label = label.map(|l| l.0),
            current,
            total,
            "progress"
        );
    }

    fn prevent_cancel(&mut self) {
        info!(request = self.index, "cancellation no longer possible");
    }

    fn finished(&mut self, outcome: OperationOutcome) {
        if let Some(done) = self.done.take() {
            let _ = done.send(outcome);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let steps = cli.steps;
    let step = Duration::from_millis(cli.step_ms);
    let registry =
        OperationRegistry::with_all(move |env: OperationEnv| -> Box<dyn ExecutableOperation> {
            Box::new(SteppingOperation { env, steps, step })
        });

    let repository = Arc::new(MemoryKeyRepository::new());
    let config = DispatcherConfig {
        initial_quiescence_delay: Duration::from_millis(cli.quiescence_ms),
        coalesce_progress: cli.coalesce,
    };
    let dispatcher = OperationDispatcher::new(registry, repository.clone(), &config);

    let mut pending = Vec::with_capacity(cli.count);
    for index in 0..cli.count {
        let kind = OperationKind::ALL[index % OperationKind::ALL.len()];
        let payload = Payload::new(u64::try_from(index)?.to_be_bytes().to_vec());
        let (done_tx, done_rx) = oneshot::channel();
        let handle = dispatcher.start(
            OperationRequest::new(kind, payload),
            CryptoInput::default(),
            LoggingCallback {
                index,
                done: Some(done_tx),
            },
        );
        if cli.cancel_every > 0 && index % cli.cancel_every == 0 {
            handle.cancel();
        }
        pending.push((index, kind, done_rx));
    }

    for (index, kind, done_rx) in pending {
        match done_rx.await? {
            OperationOutcome::Completed(result) => {
                println!("{index:>3} {kind:<15} {}", serde_json::to_string(&result)?);
            }
            OperationOutcome::CancelledBeforeStart => {
                println!("{index:>3} {kind:<15} cancelled before start");
            }
        }
    }

    dispatcher.shutdown().await;
    info!(stored = repository.len(), "done");
    Ok(())
}
