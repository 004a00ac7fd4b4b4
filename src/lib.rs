//! # Qiyam Library
//!
//! Internal library for the `qiyam` binary.
//!
//! This library exists to enable testing of the internals and provide clean separation
//! between CLI dispatch (main.rs) and application logic.
//!
//! ## Architecture
//!
//! - **Night math**: `night` parses provider times, anchors them to the right civil
//!   day, computes the last third of the night and projects its state at an instant
//! - **Providers**: `provider` fetches timings and places over HTTP, with a per-key
//!   fetch cache, retry backoff and timezone lookup
//! - **Watch loop**: `core` drives the live countdown from a `scheduler` of periodic
//!   tasks and the `signals` message channel
//! - **Configuration**: `config` for TOML settings with validation and hot reload
//! - **Commands**: `commands` for the CLI subcommands (show, summary, search, set, ...)
//! - **Infrastructure**: logging, time source (real or simulated), display formatting

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod commands;
pub mod config;
pub mod constants;
pub mod core;
pub mod display;
pub mod error;
pub mod night;
pub mod provider;
pub mod scheduler;
pub mod signals;
pub mod time_source;

pub use error::QiyamError;
