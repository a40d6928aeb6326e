//! Worker-isolated task execution.
//!
//! A task runs one heavy operation in a spawned worker that shares no state
//! with the page side; the only interaction is the bounded event channel
//! carrying the typed [`protocol::TaskEvent`] union. At most one task is in
//! flight per tool instance.

pub mod protocol;
pub mod worker;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::types::TaskId;
use protocol::TaskEvent;

/// Handle to an in-flight worker task.
///
/// Owned by the instance that started it; terminated on completion, error,
/// or disposal of the owner.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    events: mpsc::Receiver<TaskEvent>,
    join: JoinHandle<()>,
    cancel: CancellationToken,
}

impl TaskHandle {
    pub(crate) fn new(
        id: TaskId,
        events: mpsc::Receiver<TaskEvent>,
        join: JoinHandle<()>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            events,
            join,
            cancel,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Receive the next event in send order. `None` means the worker is gone;
    /// if no terminal event was seen first, the worker died without reporting.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        self.events.recv().await
    }

    /// Terminate the worker unconditionally. No partial result survives.
    pub fn terminate(&self) {
        self.cancel.cancel();
        self.join.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
