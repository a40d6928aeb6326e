//! Task worker message protocol.
//!
//! The typed tagged union shared by both sides of the worker channel. A task
//! emits zero or more `Log`/`Progress` events followed by exactly one
//! terminal event (`Complete` or `Error`); nothing is processed after the
//! terminal event.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::PreparedAudio;
use crate::types::{Error, TaskId};

/// Severity attached to log events and activity-log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Icon prefix used in rendered log lines.
    pub fn icon(self) -> &'static str {
        match self {
            LogLevel::Info => "ℹ",
            LogLevel::Success => "✓",
            LogLevel::Warning => "⚠",
            LogLevel::Error => "✗",
        }
    }
}

/// Events relayed from a worker to its owning instance, in send order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEvent {
    Log {
        level: LogLevel,
        message: String,
    },
    Progress {
        /// Phase index into the workload's [`crate::progress::PhasePlan`].
        phase: usize,
        /// Raw phase-local percentage; clamped by the receiver, never rejected.
        raw_percent: f64,
    },
    Complete(TaskResult),
    Error(TaskFailure),
}

impl TaskEvent {
    /// Terminal events end the task; the channel is torn down after one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskEvent::Complete(_) | TaskEvent::Error(_))
    }
}

/// Why a task failed. Initialization failures (model/codec load inside the
/// worker) are distinguishable from execution failures (library ran but
/// rejected the input or parameters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Initialization,
    Execution,
}

/// Terminal failure payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn initialization(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Initialization,
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Execution,
            message: message.into(),
        }
    }

    /// Map onto the application error taxonomy.
    pub fn to_error(&self) -> Error {
        match self.kind {
            FailureKind::Initialization => Error::worker_initialization(self.message.clone()),
            FailureKind::Execution => Error::worker_execution(self.message.clone()),
        }
    }
}

/// Input payload handed to a worker. Each task operates on its own copy;
/// nothing is shared with the page side after dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Raw container bytes (video re-encode, image compression, OCR).
    Bytes {
        data: Bytes,
        file_name: Option<String>,
    },
    /// Pre-decoded fixed-shape samples (speech transcription).
    Audio(PreparedAudio),
}

impl TaskPayload {
    /// Payload size in bytes, for log lines.
    pub fn len(&self) -> usize {
        match self {
            TaskPayload::Bytes { data, .. } => data.len(),
            TaskPayload::Audio(audio) => audio.samples.len() * std::mem::size_of::<f32>(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One offloaded unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: TaskId,
    pub payload: TaskPayload,
    /// Declared tool parameters, validated against the tool's parameter
    /// definitions before dispatch.
    pub params: Value,
}

impl TaskSpec {
    pub fn new(payload: TaskPayload, params: Value) -> Self {
        Self {
            id: TaskId::new(),
            payload,
            params,
        }
    }
}

/// A timestamped transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSpan {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Typed result of a completed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskResult {
    /// Plain extracted or generated text.
    Text { text: String },
    /// Transcription with optional timestamped segments.
    Transcript {
        text: String,
        spans: Vec<TranscriptSpan>,
    },
    /// Recognized text with a confidence score (0–100).
    Recognition { text: String, confidence: f32 },
    /// Encoded output bytes (re-encoded video, compressed image).
    Media {
        data: Bytes,
        content_type: String,
        file_name: String,
    },
}

impl TaskResult {
    /// Render the textual form of a result, if it has one.
    ///
    /// Transcript spans render one per line as `[0.00s -> 2.40s] text`,
    /// matching what the result pane shows.
    pub fn render_text(&self) -> Option<String> {
        match self {
            TaskResult::Text { text } => Some(text.clone()),
            TaskResult::Transcript { text, spans } => {
                if spans.is_empty() {
                    Some(text.clone())
                } else {
                    Some(
                        spans
                            .iter()
                            .map(|s| {
                                format!("[{:.2}s -> {:.2}s] {}", s.start_secs, s.end_secs, s.text)
                            })
                            .collect::<Vec<_>>()
                            .join("\n"),
                    )
                }
            }
            TaskResult::Recognition { text, .. } => Some(text.clone()),
            TaskResult::Media { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(!TaskEvent::Log {
            level: LogLevel::Info,
            message: "hi".into()
        }
        .is_terminal());
        assert!(!TaskEvent::Progress {
            phase: 0,
            raw_percent: 10.0
        }
        .is_terminal());
        assert!(TaskEvent::Complete(TaskResult::Text { text: "ok".into() }).is_terminal());
        assert!(TaskEvent::Error(TaskFailure::execution("bad input")).is_terminal());
    }

    #[test]
    fn failure_kinds_map_to_distinct_errors() {
        let init = TaskFailure::initialization("model fetch failed").to_error();
        let exec = TaskFailure::execution("decode failed").to_error();
        assert!(init.to_string().contains("worker initialization"));
        assert!(exec.to_string().contains("worker execution"));
    }

    #[test]
    fn transcript_spans_render_with_timestamps() {
        let result = TaskResult::Transcript {
            text: "hello world".into(),
            spans: vec![
                TranscriptSpan {
                    start_secs: 0.0,
                    end_secs: 1.5,
                    text: "hello".into(),
                },
                TranscriptSpan {
                    start_secs: 1.5,
                    end_secs: 2.4,
                    text: "world".into(),
                },
            ],
        };
        let rendered = result.render_text().unwrap();
        assert_eq!(rendered, "[0.00s -> 1.50s] hello\n[1.50s -> 2.40s] world");
    }

    #[test]
    fn spanless_transcript_renders_full_text() {
        let result = TaskResult::Transcript {
            text: "hello world".into(),
            spans: Vec::new(),
        };
        assert_eq!(result.render_text().unwrap(), "hello world");
    }

    #[test]
    fn media_results_have_no_text_form() {
        let result = TaskResult::Media {
            data: Bytes::from_static(b"mp4"),
            content_type: "video/mp4".into(),
            file_name: "converted_video.mp4".into(),
        };
        assert!(result.render_text().is_none());
    }

    #[test]
    fn events_serialize_tagged() {
        let event = TaskEvent::Progress {
            phase: 2,
            raw_percent: 37.5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "progress");
        assert_eq!(json["phase"], 2);
    }
}
