//! Per-bundle build orchestration.
//!
//! One orchestrator owns one logical bundle (the support runtime or the
//! application). It runs the blocking initial build, then drives the
//! rebuild loop from watcher events, broadcasting a `building: true`
//! message before each rebuild and exactly one `building: false`
//! message after it. A failed rebuild keeps the loop alive; the next
//! file change retries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{BuildEngine, BuildReport, BundleSpec};
use crate::error::{BuildError, Result};
use crate::ui;

use super::broadcast::Broadcaster;
use super::protocol::BuildStatus;

/// Where a bundle is in its build lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    InitialBuilding,
    InitialFailed,
    Watching,
    Rebuilding,
}

/// Drives builds for one bundle and reports status to connected tabs.
pub struct BuildOrchestrator {
    spec: BundleSpec,
    engine: Arc<dyn BuildEngine>,
    broadcaster: Arc<Broadcaster>,
    phase: Arc<RwLock<BuildPhase>>,
}

impl BuildOrchestrator {
    pub fn new(
        spec: BundleSpec,
        engine: Arc<dyn BuildEngine>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            spec,
            engine,
            broadcaster,
            phase: Arc::new(RwLock::new(BuildPhase::Idle)),
        }
    }

    pub fn phase(&self) -> BuildPhase {
        *self.phase.read()
    }

    pub fn bundle_name(&self) -> &str {
        &self.spec.name
    }

    /// Run the initial build to completion.
    ///
    /// Startup must not proceed until this returns: the first page load
    /// has to find output on disk. Failure is fatal to startup.
    pub async fn initial_build(&self) -> Result<BuildReport> {
        *self.phase.write() = BuildPhase::InitialBuilding;
        let start = Instant::now();

        match self.engine.build(&self.spec).await {
            Ok(report) => {
                *self.phase.write() = BuildPhase::Watching;
                tracing::info!(
                    bundle = %self.spec.name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "initial build finished"
                );
                for warning in &report.warnings {
                    ui::warning(warning);
                }
                Ok(report)
            }
            Err(failure) => {
                *self.phase.write() = BuildPhase::InitialFailed;
                for error in &failure.errors {
                    ui::error(error);
                }
                Err(BuildError::InitialBuild {
                    bundle: self.spec.name.clone(),
                    errors: failure.errors,
                }
                .into())
            }
        }
    }

    /// Spawn the rebuild loop over a stream of changed paths.
    ///
    /// Runs until the change channel closes or the task is aborted.
    pub fn spawn_watch(self: Arc<Self>, mut changes: mpsc::Receiver<PathBuf>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(path) = changes.recv().await {
                tracing::debug!(
                    bundle = %self.spec.name,
                    path = %path.display(),
                    "file changed, rebuilding"
                );
                self.rebuild().await;
            }
        })
    }

    /// One rebuild cycle: announce, build, announce the outcome.
    pub async fn rebuild(&self) {
        *self.phase.write() = BuildPhase::Rebuilding;
        self.broadcaster
            .broadcast(&BuildStatus::started(&self.spec.name))
            .await;

        let start = Instant::now();
        let report = match self.engine.build(&self.spec).await {
            Ok(report) => {
                tracing::info!(
                    bundle = %self.spec.name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "rebuild finished"
                );
                report
            }
            Err(failure) => {
                tracing::warn!(bundle = %self.spec.name, "rebuild failed");
                for error in &failure.errors {
                    ui::error(error);
                }
                BuildReport {
                    warnings: Vec::new(),
                    errors: failure.errors,
                }
            }
        };

        *self.phase.write() = BuildPhase::Watching;
        self.broadcaster
            .broadcast(&BuildStatus::finished(&self.spec.name, report))
            .await;
    }
}
