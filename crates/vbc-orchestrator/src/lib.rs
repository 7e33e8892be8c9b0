//! vbc-orchestrator
//!
//! Durable workflow engine for contract analytics runs. Drives one contract
//! and period through extraction, validation, analysis and reporting,
//! persisting state after every transition so a run can be paused,
//! cancelled, or resumed after a crash.
//!
//! Public API:
//! - `Orchestrator::submit()`: create a pending workflow
//! - `Orchestrator::run()`: drive it from its persisted position
//! - `Orchestrator::pause()` / `resume()` / `cancel()`: lifecycle control
//! - `Orchestrator::status()` / `list()`: read persisted state

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod retry;
pub mod source;
pub mod store;

pub use crate::error::{OrchestratorError, format_err_chain};
pub use crate::events::TransitionEvent;
pub use crate::orchestrator::Orchestrator;
pub use crate::retry::RetryPolicy;
pub use crate::source::{BoxFuture, DataSource};
pub use crate::store::{
    FileStateStore, MemoryStateStore, Snapshot, StateStore, check_workflow_id, write_atomic,
};
