//! vbc-cli
//!
//! Configuration and wiring for the `vbc` command-line driver.

pub mod app;
pub mod config;
