//! Worker entry point.
//!
//! Statically defined, in contrast to ad hoc code blobs: the worker owns
//! heavy-library initialization, relays log/progress events, and emits
//! exactly one terminal event before returning. Dropping the sender on
//! return is what tears the channel down, so the terminal event is always
//! the last one a receiver can observe.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::engine::{ProcessingEngine, ProgressSink};
use crate::task::protocol::{TaskEvent, TaskFailure, TaskSpec};
use crate::task::TaskHandle;
use crate::types::WorkerConfig;

/// Spawn a worker for one task.
///
/// `base_phase` is the number of caller-side preparation phases already run;
/// engine-reported phases are offset past them. The returned handle's
/// cancellation token abandons the run without emitting further events.
pub fn spawn(
    mut engine: Box<dyn ProcessingEngine>,
    spec: TaskSpec,
    config: &WorkerConfig,
    base_phase: usize,
    cancel: CancellationToken,
) -> TaskHandle {
    let (tx, rx) = mpsc::channel(config.event_channel_capacity);
    let task_id = spec.id.clone();
    let id = task_id.clone();
    let token = cancel.clone();

    let join = tokio::spawn(async move {
        let sink = ProgressSink::new(tx.clone(), base_phase);

        let run = async {
            sink.info(format!("{} worker started", engine.name())).await;

            if let Err(e) = engine.initialize(&sink).await {
                return TaskEvent::Error(TaskFailure::initialization(e.to_string()));
            }

            match engine.process(&spec, &sink).await {
                Ok(result) => TaskEvent::Complete(result),
                Err(e) => TaskEvent::Error(TaskFailure::execution(e.to_string())),
            }
        };

        let terminal = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(task_id = %task_id, "task abandoned by disposal");
                return;
            }
            terminal = run => terminal,
        };

        if tx.send(terminal).await.is_err() {
            tracing::debug!(task_id = %task_id, "terminal event dropped, receiver gone");
        }
        // tx dropped here: channel closes, nothing can follow the terminal event
    });

    TaskHandle::new(id, rx, join, cancel)
}
