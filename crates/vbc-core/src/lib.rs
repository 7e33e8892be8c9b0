//! vbc-core
//!
//! Pure domain types and state key conventions for value-based-care
//! contract analytics. No I/O; this is the shared vocabulary of the
//! validation, metrics, and orchestration crates.

pub mod error;
pub mod models;
pub mod period;
pub mod state_keys;

pub use crate::error::CoreError;
pub use crate::period::Period;
