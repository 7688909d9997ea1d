//! Error handling for the beacon CLI.
//!
//! A small `thiserror` hierarchy: [`CliError`] is the top-level type
//! every command returns, [`BuildError`] covers the build/startup
//! failures with their own taxonomy. Conversion from domain errors is
//! automatic via `#[from]`; the binary converts the final error into a
//! miette report for display.

use std::path::PathBuf;

use beacon_config::{ConfigError, PathsError};
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file errors (malformed or unreadable).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Project layout errors (missing required files).
    #[error("{0}")]
    Paths(#[from] PathsError),

    /// Build and startup failures.
    #[error("{0}")]
    Build(#[from] BuildError),

    /// Invalid command-line arguments or options.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors.
    #[error("server error: {0}")]
    Server(String),

    /// File watching errors.
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages.
    #[error("{0}")]
    Custom(String),
}

/// Build and startup failures.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The blocking first build of a bundle failed. Fatal: the server
    /// (or one-shot build) aborts with a non-zero exit.
    #[error("failed to compile '{bundle}':\n{}", .errors.join("\n"))]
    InitialBuild {
        /// Logical bundle name ("app" or "runtime").
        bundle: String,
        /// Human-formatted error strings, in build order.
        errors: Vec<String>,
    },

    /// No free port could be found near the preferred one.
    #[error("ports {start}-{end} are all in use\n\nHint: stop the other process or pass --port")]
    PortUnavailable { start: u16, end: u16 },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for enriching `Result`s with context.
pub trait ResultExt<T> {
    /// Prefix the error with a short description of what was being done.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;

    /// Turn a not-found I/O error into a `FileNotFound` with the path.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{msg}: {err}"))
        })
    }

    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }
}

/// Convert a `CliError` into a miette report for terminal display.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Build(e) => miette::miette!("{e}"),
        CliError::Config(e) => miette::miette!("configuration error: {e}"),
        other => miette::miette!("{other}"),
    }
}
