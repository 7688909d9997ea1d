//! Beacon - front-end development server with live reload.
//!
//! The crate is organized into a few key modules:
//!
//! - [`error`] - error types with actionable messages
//! - [`logger`] - structured logging with tracing
//! - [`ui`] - colored terminal status output
//! - [`net`] - host/port/URL resolution, memoized once per process
//! - [`engine`] - the external build-engine boundary
//! - [`dev`] - the development server: orchestration, push channel,
//!   reload protocol, proxy routing
//! - `commands` - CLI command implementations

pub mod cli;
pub mod commands;
pub mod dev;
pub mod engine;
pub mod error;
pub mod logger;
pub mod net;
pub mod ui;

pub use error::{BuildError, CliError, Result, ResultExt};
