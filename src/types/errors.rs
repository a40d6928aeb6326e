//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the Medley core.
#[derive(Error, Debug)]
pub enum Error {
    /// No tool module is registered for the requested descriptor.
    #[error("no tool registered for {category}/{id}")]
    ModuleNotFound { category: String, id: String },

    /// A registered tool module failed to load (both loading strategies).
    #[error("module load failed: {0}")]
    ModuleLoad(String),

    /// A required element declared by the tool is missing from the render target.
    #[error("binding error: {0}")]
    Binding(String),

    /// The offered input does not match the tool's accepted input kinds.
    #[error("unsupported input type: {0}")]
    UnsupportedInputType(String),

    /// `start_processing` was called with no input bound.
    #[error("no input selected")]
    NoInputSelected,

    /// A task is already in flight for this instance.
    #[error("a task is already running")]
    AlreadyRunning,

    /// Invalid lifecycle transition (e.g. operating on a disposed instance).
    #[error("state transition error: {0}")]
    StateTransition(String),

    /// Caller-side input acquisition or decode failed before dispatch.
    #[error("input preparation failed: {0}")]
    InputPreparation(String),

    /// The heavy library failed to initialize inside the worker.
    #[error("worker initialization failed: {0}")]
    WorkerInitialization(String),

    /// The heavy library ran but failed during processing.
    #[error("worker execution failed: {0}")]
    WorkerExecution(String),

    /// A resource release step failed. Logged, never escalated.
    #[error("resource release failed: {0}")]
    ResourceRelease(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport errors (URL input sources).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn module_not_found(category: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ModuleNotFound {
            category: category.into(),
            id: id.into(),
        }
    }

    pub fn module_load(msg: impl Into<String>) -> Self {
        Self::ModuleLoad(msg.into())
    }

    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    pub fn unsupported_input(msg: impl Into<String>) -> Self {
        Self::UnsupportedInputType(msg.into())
    }

    pub fn state_transition(msg: impl Into<String>) -> Self {
        Self::StateTransition(msg.into())
    }

    pub fn input_preparation(msg: impl Into<String>) -> Self {
        Self::InputPreparation(msg.into())
    }

    pub fn worker_initialization(msg: impl Into<String>) -> Self {
        Self::WorkerInitialization(msg.into())
    }

    pub fn worker_execution(msg: impl Into<String>) -> Self {
        Self::WorkerExecution(msg.into())
    }

    pub fn resource_release(msg: impl Into<String>) -> Self {
        Self::ResourceRelease(msg.into())
    }

    /// True for the caller-contract violations that leave instance state
    /// untouched (`acceptInput`/`startProcessing` guards).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedInputType(_) | Error::NoInputSelected | Error::AlreadyRunning
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_not_found_names_descriptor() {
        let err = Error::module_not_found("video", "mp4");
        assert_eq!(err.to_string(), "no tool registered for video/mp4");
    }

    #[test]
    fn guard_errors_are_recoverable() {
        assert!(Error::NoInputSelected.is_recoverable());
        assert!(Error::AlreadyRunning.is_recoverable());
        assert!(Error::unsupported_input("text/plain").is_recoverable());
        assert!(!Error::module_load("fetch failed").is_recoverable());
        assert!(!Error::worker_execution("decode failed").is_recoverable());
    }
}
