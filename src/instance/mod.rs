//! Tool instance lifecycle.
//!
//! One instance exists per active tool view. It walks the state machine
//! `constructed → bound → ready → running ⇄ ready → disposed`, owns the
//! element bindings, the append-only activity log, the current input, and
//! every transient resource created by a run. Exactly one worker task may be
//! in flight; disposal terminates it unconditionally and discards anything
//! it still sends.

pub mod bindings;
pub mod input;
pub mod log;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::media::{self, AudioDecoder};
use crate::progress::ProgressAggregator;
use crate::registry::{params, ToolModule};
use crate::resources::ResourceTracker;
use crate::task::protocol::{LogLevel, TaskEvent, TaskFailure, TaskPayload, TaskResult, TaskSpec};
use crate::task::{worker, TaskHandle};
use crate::types::{Config, Error, ResourceId, Result};

pub use bindings::{ElementBindings, ElementHandle, ElementSpec, RenderTarget};
pub use input::{format_file_size, InputSource, MediaKind};
pub use log::{ActivityLog, LogEntry};

/// Instance lifecycle state.
///
/// State transitions:
/// ```text
/// CONSTRUCTED → BOUND → READY ⇄ RUNNING
///       ↓         ↓       ↓       ↓
///                 DISPOSED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    Constructed,
    Bound,
    Ready,
    Running,
    Disposed,
}

impl InstanceState {
    /// Check if this is the terminal state.
    pub fn is_terminal(self) -> bool {
        self == InstanceState::Disposed
    }

    /// Check if the instance accepts a processing trigger.
    pub fn accepts_trigger(self) -> bool {
        self == InstanceState::Ready
    }

    /// Check if transition is valid.
    pub fn can_transition_to(self, to: InstanceState) -> bool {
        match (self, to) {
            (InstanceState::Constructed, InstanceState::Bound) => true,
            (InstanceState::Bound, InstanceState::Ready) => true,
            (InstanceState::Ready, InstanceState::Running) => true,
            (InstanceState::Running, InstanceState::Ready) => true,
            // Any live state can be disposed
            (s, InstanceState::Disposed) => s != InstanceState::Disposed,
            _ => false,
        }
    }
}

/// Current processing status as surfaced to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Outcome of one completed processing run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Succeeded(TaskResult),
    Failed(TaskFailure),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded(_))
    }
}

/// Runtime object for one active view of a tool.
pub struct ToolInstance {
    module: Arc<dyn ToolModule>,
    target: Box<dyn RenderTarget>,
    config: Arc<Config>,
    decoder: Option<Arc<dyn AudioDecoder>>,
    state: InstanceState,
    bindings: Option<ElementBindings>,
    input: Option<InputSource>,
    params: Option<serde_json::Value>,
    log: ActivityLog,
    resources: ResourceTracker,
    task: Option<TaskHandle>,
    aggregator: Option<ProgressAggregator>,
    cancel: CancellationToken,
    last_outcome: Option<RunOutcome>,
}

impl fmt::Debug for ToolInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolInstance")
            .field("tool", &self.module.descriptor().path())
            .field("state", &self.state)
            .field("input", &self.input)
            .field("tracked_resources", &self.resources.len())
            .finish_non_exhaustive()
    }
}

impl ToolInstance {
    /// Construct an instance bound to one page view.
    pub fn new(
        module: Arc<dyn ToolModule>,
        target: Box<dyn RenderTarget>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            module,
            target,
            config,
            decoder: None,
            state: InstanceState::Constructed,
            bindings: None,
            input: None,
            params: None,
            log: ActivityLog::new(),
            resources: ResourceTracker::new(),
            task: None,
            aggregator: None,
            cancel: CancellationToken::new(),
            last_outcome: None,
        }
    }

    /// Attach the caller-side decode capability (required by tools whose
    /// engines consume fixed-shape audio).
    pub fn with_audio_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn status(&self) -> ProcessingStatus {
        match (self.state, &self.last_outcome) {
            (InstanceState::Running, _) => ProcessingStatus::Running,
            (_, Some(RunOutcome::Succeeded(_))) => ProcessingStatus::Succeeded,
            (_, Some(RunOutcome::Failed(_))) => ProcessingStatus::Failed,
            _ => ProcessingStatus::Idle,
        }
    }

    pub fn module(&self) -> &Arc<dyn ToolModule> {
        &self.module
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn input(&self) -> Option<&InputSource> {
        self.input.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&RunOutcome> {
        self.last_outcome.as_ref()
    }

    /// Number of transient resources currently tracked.
    pub fn tracked_resources(&self) -> usize {
        self.resources.len()
    }

    /// Register an embedder-owned transient resource (e.g. an object URL
    /// created while rendering a result). Released with everything else on
    /// the next terminal path.
    pub fn track_resource<F>(&mut self, label: impl Into<String>, release: F) -> ResourceId
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.resources.track(label, release)
    }

    /// `constructed → bound → ready`. Idempotent: calling again once ready
    /// is a no-op.
    ///
    /// Binding resolves the module's declared element map against the render
    /// target; a missing required element fails with [`Error::Binding`] and
    /// the instance does not proceed to ready.
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            InstanceState::Ready | InstanceState::Running => Ok(()),
            InstanceState::Disposed => Err(Error::state_transition(
                "cannot initialize a disposed instance",
            )),
            InstanceState::Constructed | InstanceState::Bound => {
                let resolved =
                    ElementBindings::resolve(self.module.element_map(), self.target.as_ref());
                let bindings = match resolved {
                    Ok(b) => b,
                    Err(e) => {
                        let line = self.log.append(LogLevel::Error, e.to_string());
                        self.target.append_log(&line);
                        return Err(e);
                    }
                };
                self.bindings = Some(bindings);
                self.state = InstanceState::Bound;

                // Control wiring: the processing trigger stays disabled
                // until an input is accepted.
                self.target.set_action_enabled(false);
                let line = self
                    .log
                    .append(LogLevel::Info, format!("{} ready", self.module.title()));
                self.target.append_log(&line);
                self.state = InstanceState::Ready;
                Ok(())
            }
        }
    }

    /// Bindings resolved during `initialize`.
    pub fn bindings(&self) -> Option<&ElementBindings> {
        self.bindings.as_ref()
    }

    /// Offer an input source. Validated against the tool's accepted kinds;
    /// rejection leaves the previously accepted input in place.
    pub fn accept_input(&mut self, source: InputSource) -> Result<()> {
        match self.state {
            InstanceState::Running => {
                let line = self
                    .log
                    .append(LogLevel::Warning, "input ignored while a task is running");
                self.target.append_log(&line);
                Err(Error::AlreadyRunning)
            }
            InstanceState::Disposed => Err(Error::state_transition(
                "cannot accept input on a disposed instance",
            )),
            InstanceState::Constructed | InstanceState::Bound => Err(Error::state_transition(
                "initialize the instance before offering input",
            )),
            InstanceState::Ready => match input::validate(&source, self.module.accepted_inputs()) {
                Ok(kind) => {
                    let line = self.log.append(
                        LogLevel::Info,
                        format!("{} input selected: {}", kind.describe(), source.display_name()),
                    );
                    self.target.append_log(&line);
                    self.input = Some(source);
                    self.target.set_action_enabled(true);
                    Ok(())
                }
                Err(e) => {
                    let line = self.log.append(LogLevel::Error, e.to_string());
                    self.target.append_log(&line);
                    Err(e)
                }
            },
        }
    }

    /// Set processing parameters. Values are validated against the tool's
    /// declared parameter definitions with defaults filled in.
    pub fn set_parameters(&mut self, params: serde_json::Value) -> Result<()> {
        match self.state {
            InstanceState::Disposed => Err(Error::state_transition(
                "cannot set parameters on a disposed instance",
            )),
            InstanceState::Running => Err(Error::AlreadyRunning),
            _ => {
                let mut filled = params;
                params::fill_defaults(self.module.parameters(), &mut filled);
                let errors = params::validate_params(self.module.parameters(), &filled);
                if !errors.is_empty() {
                    let err =
                        Error::input_preparation(format!("invalid parameters: {}", errors.join("; ")));
                    let line = self.log.append(LogLevel::Error, err.to_string());
                    self.target.append_log(&line);
                    return Err(err);
                }
                self.params = Some(filled);
                Ok(())
            }
        }
    }

    /// `ready → running`. Acquires the input, runs caller-side preparation
    /// phases, and dispatches the worker task. Returns once the worker is in
    /// flight; drive it with [`ToolInstance::await_completion`].
    pub async fn start_processing(&mut self) -> Result<()> {
        // Caller-contract guards: reported inline, no state change.
        match self.state {
            InstanceState::Running => {
                let line = self.log.append(
                    LogLevel::Warning,
                    "processing trigger ignored: a task is already running",
                );
                self.target.append_log(&line);
                return Err(Error::AlreadyRunning);
            }
            InstanceState::Disposed => {
                return Err(Error::state_transition(
                    "cannot start processing on a disposed instance",
                ));
            }
            InstanceState::Constructed | InstanceState::Bound => {
                return Err(Error::state_transition(
                    "initialize the instance before processing",
                ));
            }
            InstanceState::Ready => {}
        }
        let Some(source) = self.input.clone() else {
            let line = self
                .log
                .append(LogLevel::Error, Error::NoInputSelected.to_string());
            self.target.append_log(&line);
            return Err(Error::NoInputSelected);
        };

        self.state = InstanceState::Running;
        self.target.set_action_enabled(false);

        match self.dispatch(source).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Preparation failed before a worker existed: terminal path.
                let line = self.log.append(LogLevel::Error, e.to_string());
                self.target.append_log(&line);
                self.target.hide_progress();
                self.finish_run(None);
                Err(e)
            }
        }
    }

    /// Preparation phases plus worker dispatch. Split out so every failure
    /// funnels through one terminal path in `start_processing`.
    async fn dispatch(&mut self, source: InputSource) -> Result<()> {
        let mut aggregator = ProgressAggregator::new(self.module.phase_plan());

        // Validated parameters with defaults filled in.
        let mut task_params = self.params.clone().unwrap_or_else(|| serde_json::json!({}));
        params::fill_defaults(self.module.parameters(), &mut task_params);
        let errors = params::validate_params(self.module.parameters(), &task_params);
        if !errors.is_empty() {
            return Err(Error::input_preparation(format!(
                "invalid parameters: {}",
                errors.join("; ")
            )));
        }

        // Phase 0: acquire input bytes.
        let line = self.log.append(
            LogLevel::Info,
            format!("processing input: {}", source.display_name()),
        );
        self.target.append_log(&line);
        self.target.set_progress(0.0, aggregator.stage_label(0));

        let fetch_config = self.config.fetch.clone();
        let data = {
            let target = self.target.as_mut();
            let agg = &mut aggregator;
            input::acquire(&source, &fetch_config, &mut |raw| {
                let shown = agg.observe(0, raw);
                let label = agg.stage_label(0).to_string();
                target.set_progress(shown, &label);
            })
            .await?
        };

        let line = self.log.append(
            LogLevel::Info,
            format!("input acquired ({})", format_file_size(data.len() as u64)),
        );
        self.target.append_log(&line);

        // Each task operates on its own copy of the input bytes; the clone
        // tracked here pins the buffer until the run's terminal path.
        let buffer = data.clone();
        self.resources.track(
            format!("input buffer ({})", format_file_size(data.len() as u64)),
            move || {
                drop(buffer);
                Ok(())
            },
        );

        // Optional phase 1: decode to the fixed shape engines expect.
        let payload = if self.module.requires_audio_decode() {
            let decoder = self.decoder.clone().ok_or_else(|| {
                Error::input_preparation("no audio decoder configured for this tool")
            })?;
            let target_rate = self.config.media.target_sample_rate;
            let line = self.log.append(
                LogLevel::Info,
                format!("decoding audio to {target_rate} Hz mono"),
            );
            self.target.append_log(&line);

            let pcm = decoder
                .decode(&data)
                .await
                .map_err(|e| Error::input_preparation(format!("audio decode: {e}")))?;
            let prepared = media::prepare(pcm, target_rate);

            let shown = aggregator.observe(1, 100.0);
            let label = aggregator.stage_label(1).to_string();
            self.target.set_progress(shown, &label);
            TaskPayload::Audio(prepared)
        } else {
            let shown = aggregator.observe(0, 100.0);
            let label = aggregator.stage_label(0).to_string();
            self.target.set_progress(shown, &label);
            TaskPayload::Bytes {
                data,
                file_name: Some(source.display_name()),
            }
        };

        // Dispatch. Engine phases are offset past the preparation phases.
        let base_phase = 1 + usize::from(self.module.requires_audio_decode());
        let spec = TaskSpec::new(payload, task_params);
        let worker_token = self.cancel.child_token();

        let guard = worker_token.clone();
        self.resources
            .track(format!("worker task {}", spec.id.short()), move || {
                guard.cancel();
                Ok(())
            });

        let handle = worker::spawn(
            self.module.create_engine(),
            spec,
            &self.config.worker,
            base_phase,
            worker_token,
        );
        self.task = Some(handle);
        self.aggregator = Some(aggregator);
        Ok(())
    }

    /// Drive the in-flight task to its terminal event, applying log and
    /// progress events along the way. `running → ready` on either outcome.
    pub async fn await_completion(&mut self) -> Result<RunOutcome> {
        if self.state != InstanceState::Running {
            return Err(Error::state_transition(format!(
                "no task in flight: state is {:?}",
                self.state
            )));
        }
        let Some(mut handle) = self.task.take() else {
            return Err(Error::state_transition("no task in flight"));
        };

        let outcome = loop {
            match handle.recv().await {
                Some(event) => {
                    if let Some(outcome) = self.apply_event(event) {
                        break outcome;
                    }
                }
                // Channel closed without a terminal event: the worker died
                // without reporting (panic or abort).
                None => {
                    break RunOutcome::Failed(TaskFailure::execution(
                        "worker terminated unexpectedly",
                    ))
                }
            }
        };

        // The channel is torn down with the handle; nothing sent after the
        // terminal event is ever processed.
        drop(handle);
        self.finish_run(Some(outcome.clone()));
        Ok(outcome)
    }

    /// Convenience: `start_processing` + `await_completion`.
    pub async fn run(&mut self) -> Result<RunOutcome> {
        self.start_processing().await?;
        self.await_completion().await
    }

    /// Apply one worker event. Returns the outcome on a terminal event.
    fn apply_event(&mut self, event: TaskEvent) -> Option<RunOutcome> {
        if self.state == InstanceState::Disposed {
            tracing::debug!("worker event discarded after disposal");
            return None;
        }

        match event {
            TaskEvent::Log { level, message } => {
                let line = self.log.append(level, message);
                self.target.append_log(&line);
                None
            }
            TaskEvent::Progress { phase, raw_percent } => {
                if let Some(agg) = self.aggregator.as_mut() {
                    let shown = agg.observe(phase, raw_percent);
                    let label = agg.stage_label(phase).to_string();
                    self.target.set_progress(shown, &label);
                }
                None
            }
            TaskEvent::Complete(result) => {
                if let Some(agg) = self.aggregator.as_mut() {
                    agg.complete();
                }
                self.target.set_progress(100.0, "complete");
                let line = self.log.append(LogLevel::Success, "processing complete");
                self.target.append_log(&line);
                self.target.render_result(&result);
                Some(RunOutcome::Succeeded(result))
            }
            TaskEvent::Error(failure) => {
                let line = self.log.append(
                    LogLevel::Error,
                    format!("processing failed: {}", failure.message),
                );
                self.target.append_log(&line);
                // Prior results stay visible; only the indicator is hidden.
                self.target.hide_progress();
                Some(RunOutcome::Failed(failure))
            }
        }
    }

    /// Terminal path shared by success, failure, and preparation errors:
    /// release resources, surface release failures, return to ready.
    fn finish_run(&mut self, outcome: Option<RunOutcome>) {
        for failure in self.resources.release_all() {
            let line = self.log.append(LogLevel::Warning, failure.to_string());
            self.target.append_log(&line);
        }
        self.task = None;
        self.aggregator = None;
        self.state = InstanceState::Ready;
        self.target.set_action_enabled(true);
        if let Some(outcome) = outcome {
            self.last_outcome = Some(outcome);
        }
    }

    /// Any state → disposed. Idempotent.
    ///
    /// Stops accepting events, terminates the worker unconditionally,
    /// releases every tracked resource, and detaches the bindings. Late
    /// worker events are discarded, never applied: the surface this
    /// instance rendered into may already be gone, so nothing is mirrored
    /// to the target here.
    pub fn dispose(&mut self) {
        if self.state == InstanceState::Disposed {
            return;
        }
        self.state = InstanceState::Disposed;
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            task.terminate();
            // Receiver dropped with the handle: in-flight events discarded.
        }

        for failure in self.resources.release_all() {
            self.log.append(LogLevel::Warning, failure.to_string());
        }

        self.bindings = None;
        self.aggregator = None;
        self.log.append(LogLevel::Info, "instance disposed");
        tracing::debug!(tool = %self.module.descriptor(), "instance disposed");
    }
}

impl Drop for ToolInstance {
    fn drop(&mut self) {
        self.dispose();
    }
}
