//! The seam to the heavy external libraries.
//!
//! Codec, OCR, and speech-recognition libraries are opaque: declared
//! parameters in, a typed result or an error out, optional progress
//! callbacks during execution. Engines run exclusively inside the task
//! worker; the instance side never touches them directly.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::task::protocol::{LogLevel, TaskEvent, TaskResult, TaskSpec};
use crate::types::Result;

/// Constructor for a fresh engine per task run.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn ProcessingEngine> + Send + Sync>;

/// One heavy media operation.
///
/// `initialize` owns model/codec loading; its failures surface to the page
/// as initialization errors, distinct from `process` failures.
#[async_trait]
pub trait ProcessingEngine: Send {
    /// Engine name for log lines.
    fn name(&self) -> &str;

    /// Load models/codec artifacts. Called once, before `process`.
    async fn initialize(&mut self, sink: &ProgressSink) -> Result<()>;

    /// Execute the operation on the task payload.
    async fn process(&mut self, spec: &TaskSpec, sink: &ProgressSink) -> Result<TaskResult>;
}

/// Progress/log relay handed to engines.
///
/// Engine-reported phases are zero-based within the engine's own share of
/// the workload; the sink offsets them past the caller-side preparation
/// phases so the full phase plan lines up.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<TaskEvent>,
    base_phase: usize,
}

impl ProgressSink {
    pub(crate) fn new(tx: mpsc::Sender<TaskEvent>, base_phase: usize) -> Self {
        Self { tx, base_phase }
    }

    /// Relay a log line. Delivery failures are ignored; the receiver is
    /// gone only when the owning instance was disposed.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let _ = self
            .tx
            .send(TaskEvent::Log {
                level,
                message: message.into(),
            })
            .await;
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message).await;
    }

    /// Relay raw progress for an engine-local phase.
    pub async fn progress(&self, phase: usize, raw_percent: f64) {
        let _ = self
            .tx
            .send(TaskEvent::Progress {
                phase: self.base_phase + phase,
                raw_percent,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_offsets_engine_phases() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ProgressSink::new(tx, 2);

        sink.progress(0, 50.0).await;
        sink.progress(1, 10.0).await;

        match rx.recv().await.unwrap() {
            TaskEvent::Progress { phase, raw_percent } => {
                assert_eq!(phase, 2);
                assert_eq!(raw_percent, 50.0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            TaskEvent::Progress { phase, .. } => assert_eq!(phase, 3),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sink_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = ProgressSink::new(tx, 0);
        // Must not panic or error out
        sink.info("late message").await;
        sink.progress(0, 99.0).await;
    }
}
