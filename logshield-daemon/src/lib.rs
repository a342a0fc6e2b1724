//! LogShield daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `logshield-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod console;
pub mod discovery;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
pub mod presenter;
pub mod report;
