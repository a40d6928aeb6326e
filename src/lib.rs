//! # Medley Core - Tool Lifecycle & Task Orchestration
//!
//! Embeddable core of the Medley media tools providing:
//! - Lazy module resolution over a closed `(category, id)` dispatch table
//! - Uniform create/bind/process/dispose tool lifecycle
//! - Worker-isolated task execution with a typed event protocol
//! - Monotonic multi-phase progress aggregation
//! - Exactly-once release of transient resources
//!
//! ## Architecture
//!
//! The instance owns all per-view state; the worker shares nothing with it
//! and communicates only through the bounded event channel:
//! ```text
//!   navigation ──▶ ModuleRegistry ──▶ ToolInstance
//!                                     ┌────────────────────────────┐
//!                                     │ Bindings   ActivityLog     │
//!                                     │ Aggregator ResourceTracker │
//!                                     └─────────┬──────────────────┘
//!                                 TaskEvent mpsc│(log/progress/terminal)
//!                                     ┌─────────┴──────────────────┐
//!                                     │ Worker: ProcessingEngine   │
//!                                     └────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod engine;
pub mod instance;
pub mod media;
pub mod progress;
pub mod registry;
pub mod resources;
pub mod task;
pub mod types;

// Internal utilities
pub mod observability;

pub use instance::{InstanceState, ProcessingStatus, RunOutcome, ToolInstance};
pub use registry::{ModuleRegistry, ToolDescriptor, ToolModule};
pub use types::{Config, Error, Result};
