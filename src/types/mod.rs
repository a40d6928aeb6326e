//! Core types for the Medley orchestrator.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (ToolId, TaskId, etc.)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for workers, media preparation, and fetching

mod config;
mod errors;
mod ids;

pub use config::{Config, FetchConfig, MediaConfig, ObservabilityConfig, WorkerConfig};
pub use errors::{Error, Result};
pub use ids::{CategoryId, ResourceId, TaskId, ToolId};
