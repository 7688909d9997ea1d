//! Command implementations.

pub mod build;
pub mod start;

use std::path::PathBuf;

use crate::error::Result;

/// Resolve the project root from an optional `--cwd` override.
pub(crate) fn resolve_project_root(cwd: Option<PathBuf>) -> Result<PathBuf> {
    match cwd {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}
