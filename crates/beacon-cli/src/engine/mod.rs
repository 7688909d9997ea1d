//! The external build-engine boundary.
//!
//! Beacon does not resolve modules or transpile anything itself; a
//! [`BuildEngine`] does. The engine contract is a single one-shot
//! `build` per bundle - watch mode lives in the orchestrator, which
//! calls `build` again for every debounced source change.

pub mod command;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use command::CommandEngine;

/// Outcome of a successful build: human-formatted diagnostics only,
/// already ordered the way the engine produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl BuildReport {
    /// A report with no diagnostics at all.
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }
}

/// A failed build, carrying formatted error strings in build order.
#[derive(Debug, Clone, Error)]
#[error("build failed:\n{}", .errors.join("\n"))]
pub struct BuildFailure {
    pub errors: Vec<String>,
}

impl BuildFailure {
    pub fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }
}

/// Everything an engine needs to build one logical bundle.
#[derive(Debug, Clone)]
pub struct BundleSpec {
    /// Logical bundle name ("app" or "runtime").
    pub name: String,
    /// Entry point file.
    pub entry: PathBuf,
    /// Output directory for this bundle.
    pub out_dir: PathBuf,
    /// Compile-time defines (`process.env.*` and friends).
    pub defines: BTreeMap<String, String>,
    /// File-extension loader overrides from the config file.
    pub loader: BTreeMap<String, String>,
    /// Public URL the output will be served under.
    pub public_url: String,
    /// Minify output (production builds only).
    pub minify: bool,
}

impl BundleSpec {
    pub fn new(name: impl Into<String>, entry: PathBuf, out_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            entry,
            out_dir,
            defines: BTreeMap::new(),
            loader: BTreeMap::new(),
            public_url: "/".to_string(),
            minify: false,
        }
    }
}

/// The build engine interface.
///
/// `Ok` means the bundle was produced (possibly with warnings); `Err`
/// means no usable output exists. The orchestrator decides whether an
/// `Err` is fatal (initial build) or recoverable (rebuild).
#[async_trait]
pub trait BuildEngine: Send + Sync {
    async fn build(&self, spec: &BundleSpec) -> Result<BuildReport, BuildFailure>;
}
