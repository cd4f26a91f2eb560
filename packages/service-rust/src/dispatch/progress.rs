//! Progress channel: carries signals from the worker back to the caller's context.
//!
//! Every dispatch shares one unbounded mpsc channel drained by a single
//! delivery task. Signals from the worker (progress, prevent-cancel, terminal)
//! and callback registrations from `start` travel through the same channel,
//! so per-dispatch order is the emission order and a terminal signal is always
//! the last thing a callback sees.

use std::collections::HashMap;

use keyops_core::{ProgressLabel, ProgressUpdate, Progressable};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::callback::{OperationCallback, OperationOutcome};
use super::DispatchId;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A signal for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent {
    Progress(ProgressUpdate),
    PreventCancel,
    Finished(OperationOutcome),
}

enum Delivery {
    Attach {
        id: DispatchId,
        callback: Box<dyn OperationCallback>,
    },
    Event {
        id: DispatchId,
        event: OperationEvent,
    },
}

// ---------------------------------------------------------------------------
// ProgressChannel
// ---------------------------------------------------------------------------

/// Sending side of the delivery loop. Cheap to clone.
#[derive(Clone)]
pub struct ProgressChannel {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ProgressChannel {
    /// Spawn the delivery task. It runs until every `ProgressChannel` clone
    /// (and every sink) is dropped.
    ///
    /// With `coalesce` set, the task drains all pending messages per wake-up
    /// and drops progress updates superseded by a newer one for the same
    /// dispatch (see [`coalesce`]).
    #[must_use]
    pub fn spawn(coalesce: bool) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(deliver(rx, coalesce));
        (Self { tx }, handle)
    }

    /// Register the callback for `id`. Must precede any event for `id`.
    pub fn attach(&self, id: DispatchId, callback: Box<dyn OperationCallback>) {
        self.send(Delivery::Attach { id, callback });
    }

    /// Sink the operation for `id` reports through.
    #[must_use]
    pub fn sink(&self, id: DispatchId) -> ProgressSink {
        ProgressSink {
            id,
            channel: self.clone(),
        }
    }

    /// Deliver the terminal signal for `id`.
    pub fn finish(&self, id: DispatchId, outcome: OperationOutcome) {
        self.emit(id, OperationEvent::Finished(outcome));
    }

    fn emit(&self, id: DispatchId, event: OperationEvent) {
        self.send(Delivery::Event { id, event });
    }

    fn send(&self, delivery: Delivery) {
        // Only fails once the delivery task is gone, i.e. during runtime teardown.
        if self.tx.send(delivery).is_err() {
            tracing::warn!("progress delivery task has stopped; signal dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// ProgressSink
// ---------------------------------------------------------------------------

/// [`Progressable`] handed to an operation; tags each signal with its dispatch.
#[derive(Clone)]
pub struct ProgressSink {
    id: DispatchId,
    channel: ProgressChannel,
}

impl Progressable for ProgressSink {
    fn set_progress(&self, label: Option<ProgressLabel>, current: u32, total: u32) {
        self.channel.emit(
            self.id,
            OperationEvent::Progress(ProgressUpdate {
                label,
                current,
                total,
            }),
        );
    }

    fn set_prevent_cancel(&self) {
        self.channel.emit(self.id, OperationEvent::PreventCancel);
    }
}

// ---------------------------------------------------------------------------
// Delivery loop
// ---------------------------------------------------------------------------

async fn deliver(mut rx: mpsc::UnboundedReceiver<Delivery>, coalesce: bool) {
    let mut callbacks: HashMap<DispatchId, Box<dyn OperationCallback>> = HashMap::new();
    let mut batch = Vec::new();

    while let Some(first) = rx.recv().await {
        batch.push(first);
        if coalesce {
            while let Ok(next) = rx.try_recv() {
                batch.push(next);
            }
        }

        let mut pending = Vec::with_capacity(batch.len());
        for delivery in batch.drain(..) {
            match delivery {
                Delivery::Attach { id, callback } => {
                    callbacks.insert(id, callback);
                }
                Delivery::Event { id, event } => pending.push((id, event)),
            }
        }
        if coalesce {
            pending = self::coalesce(pending);
        }
        for (id, event) in pending {
            dispatch_event(&mut callbacks, id, event);
        }
    }
}

fn dispatch_event(
    callbacks: &mut HashMap<DispatchId, Box<dyn OperationCallback>>,
    id: DispatchId,
    event: OperationEvent,
) {
    match event {
        OperationEvent::Finished(outcome) => match callbacks.remove(&id) {
            Some(mut callback) => callback.finished(outcome),
            None => tracing::warn!(dispatch_id = id.0, "terminal signal for unknown dispatch"),
        },
        OperationEvent::Progress(update) => {
            if let Some(callback) = callbacks.get_mut(&id) {
                callback.progress(update.label, update.current, update.total);
            } else {
                tracing::trace!(dispatch_id = id.0, "progress after terminal signal dropped");
            }
        }
        OperationEvent::PreventCancel => {
            if let Some(callback) = callbacks.get_mut(&id) {
                callback.prevent_cancel();
            } else {
                tracing::trace!(dispatch_id = id.0, "prevent-cancel after terminal signal dropped");
            }
        }
    }
}

/// Drop every progress update that is immediately followed by another
/// progress update for the same dispatch.
///
/// Order is otherwise preserved. Prevent-cancel and terminal signals are never
/// dropped, and neither is the last progress update preceding a terminal one.
#[must_use]
pub fn coalesce(events: Vec<(DispatchId, OperationEvent)>) -> Vec<(DispatchId, OperationEvent)> {
    let mut kept: Vec<(DispatchId, OperationEvent)> = Vec::with_capacity(events.len());
    for (id, event) in events {
        if matches!(event, OperationEvent::Progress(_)) {
            if let Some((last_id, OperationEvent::Progress(_))) = kept.last() {
                if *last_id == id {
                    kept.pop();
                }
            }
        }
        kept.push((id, event));
    }
    kept
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keyops_core::{OperationKind, OperationResult};
    use parking_lot::Mutex;
    use proptest::prelude::*;

    use super::*;

    type Log = Arc<Mutex<Vec<(DispatchId, OperationEvent)>>>;

    struct LogCallback {
        id: DispatchId,
        log: Log,
        done: Option<tokio::sync::oneshot::Sender<()>>,
    }

    impl OperationCallback for LogCallback {
        fn needs_progress_ui(&self) -> bool {
            false
        }

        fn progress(&mut self, label: Option<ProgressLabel>, current: u32, total: u32) {
            self.log.lock().push((
                self.id,
                OperationEvent::Progress(ProgressUpdate {
                    label,
                    current,
                    total,
                }),
            ));
        }

        fn prevent_cancel(&mut self) {
            self.log.lock().push((self.id, OperationEvent::PreventCancel));
        }

        fn finished(&mut self, outcome: OperationOutcome) {
            self.log.lock().push((self.id, OperationEvent::Finished(outcome)));
            if let Some(done) = self.done.take() {
                let _ = done.send(());
            }
        }
    }

    fn progress(current: u32) -> OperationEvent {
        OperationEvent::Progress(ProgressUpdate {
            label: None,
            current,
            total: 100,
        })
    }

    fn finished_outcome() -> OperationOutcome {
        OperationOutcome::Completed(OperationResult::ok(OperationKind::Benchmark))
    }

    fn finished() -> OperationEvent {
        OperationEvent::Finished(finished_outcome())
    }

    fn attach(
        channel: &ProgressChannel,
        id: DispatchId,
        log: &Log,
    ) -> tokio::sync::oneshot::Receiver<()> {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        channel.attach(
            id,
            Box::new(LogCallback {
                id,
                log: log.clone(),
                done: Some(done_tx),
            }),
        );
        done_rx
    }

    #[tokio::test]
    async fn delivers_in_emission_order_with_terminal_last() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let (channel, _task) = ProgressChannel::spawn(false);
        let id = DispatchId(1);
        let done = attach(&channel, id, &log);

        let sink = channel.sink(id);
        sink.set_progress(Some(ProgressLabel("progress.start")), 0, 3);
        sink.set_prevent_cancel();
        sink.set_progress(None, 3, 3);
        channel.finish(id, finished_outcome());
        done.await.unwrap();

        let entries = log.lock().clone();
        assert_eq!(
            entries,
            vec![
                (
                    id,
                    OperationEvent::Progress(ProgressUpdate {
                        label: Some(ProgressLabel("progress.start")),
                        current: 0,
                        total: 3,
                    })
                ),
                (id, OperationEvent::PreventCancel),
                (
                    id,
                    OperationEvent::Progress(ProgressUpdate {
                        label: None,
                        current: 3,
                        total: 3,
                    })
                ),
                (id, OperationEvent::Finished(finished_outcome())),
            ]
        );
    }

    #[tokio::test]
    async fn nothing_is_delivered_after_terminal_signal() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let (channel, task) = ProgressChannel::spawn(false);
        let id = DispatchId(9);
        let _done = attach(&channel, id, &log);

        let sink = channel.sink(id);
        channel.finish(id, OperationOutcome::CancelledBeforeStart);
        sink.set_progress(None, 1, 2);
        sink.set_prevent_cancel();

        drop(sink);
        drop(channel);
        task.await.unwrap();

        assert_eq!(
            log.lock().clone(),
            vec![(id, OperationEvent::Finished(OperationOutcome::CancelledBeforeStart))]
        );
    }

    #[tokio::test]
    async fn coalescing_keeps_last_update_before_terminal() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let (channel, task) = ProgressChannel::spawn(true);
        let id = DispatchId(3);
        let _done = attach(&channel, id, &log);

        // Everything is queued before the delivery task gets to run.
        let sink = channel.sink(id);
        for current in 1..=50 {
            sink.set_progress(None, current, 50);
        }
        sink.set_prevent_cancel();
        channel.finish(id, finished_outcome());

        drop(sink);
        drop(channel);
        task.await.unwrap();

        let entries = log.lock().clone();
        let last_progress = entries
            .iter()
            .filter_map(|(_, e)| match e {
                OperationEvent::Progress(u) => Some(u.current),
                _ => None,
            })
            .last();
        assert_eq!(last_progress, Some(50));
        assert_eq!(entries[entries.len() - 2].1, OperationEvent::PreventCancel);
        assert!(matches!(entries.last(), Some((_, OperationEvent::Finished(_)))));
    }

    #[test]
    fn coalesce_drops_only_superseded_progress() {
        let a = DispatchId(1);
        let b = DispatchId(2);
        let events = vec![
            (a, progress(1)),
            (a, progress(2)),
            (a, OperationEvent::PreventCancel),
            (a, progress(3)),
            (a, finished()),
            (b, progress(1)),
            (b, progress(2)),
        ];

        assert_eq!(
            coalesce(events),
            vec![
                (a, progress(2)),
                (a, OperationEvent::PreventCancel),
                (a, progress(3)),
                (a, finished()),
                (b, progress(2)),
            ]
        );
    }

    fn arb_event() -> impl Strategy<Value = (DispatchId, OperationEvent)> {
        (0u64..3, 0u8..4, 0u32..1000).prop_map(|(id, tag, current)| {
            let event = match tag {
                0 | 1 => progress(current),
                2 => OperationEvent::PreventCancel,
                _ => finished(),
            };
            (DispatchId(id), event)
        })
    }

    proptest! {
        #[test]
        fn coalesce_is_an_order_preserving_subsequence(
            events in proptest::collection::vec(arb_event(), 0..64)
        ) {
            let kept = coalesce(events.clone());

            // Subsequence of the input.
            let mut it = events.iter();
            for item in &kept {
                prop_assert!(it.any(|e| e == item));
            }

            // Non-progress signals are never dropped.
            let count = |v: &[(DispatchId, OperationEvent)]| {
                v.iter().filter(|(_, e)| !matches!(e, OperationEvent::Progress(_))).count()
            };
            prop_assert_eq!(count(&kept), count(&events));

            // The final input event always survives.
            prop_assert_eq!(kept.last(), events.last());
        }
    }
}
