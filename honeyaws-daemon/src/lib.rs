//! honeyaws daemon library.
//!
//! Exposes the daemon internals for integration testing. In production
//! `honeyaws-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod runner;
pub mod state;
