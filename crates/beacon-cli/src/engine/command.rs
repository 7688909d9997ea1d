//! Build engine that shells out to an esbuild-compatible bundler.
//!
//! The bundler executable is `esbuild` by default and can be overridden
//! with the `BEACON_BUNDLER` environment variable. Diagnostics are
//! whatever the bundler printed to stderr, split into warning and error
//! lines; they are passed through as already-formatted strings.

use async_trait::async_trait;
use tokio::process::Command;

use super::{BuildEngine, BuildFailure, BuildReport, BundleSpec};

/// Environment variable naming the bundler executable.
pub const BUNDLER_ENV: &str = "BEACON_BUNDLER";

const DEFAULT_BUNDLER: &str = "esbuild";

pub struct CommandEngine {
    program: String,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Engine configured from `BEACON_BUNDLER`, defaulting to esbuild.
    pub fn from_env() -> Self {
        let program =
            std::env::var(BUNDLER_ENV).unwrap_or_else(|_| DEFAULT_BUNDLER.to_string());
        Self::new(program)
    }

    fn args_for(spec: &BundleSpec) -> Vec<String> {
        let mut args = vec![
            spec.entry.display().to_string(),
            "--bundle".to_string(),
            "--format=esm".to_string(),
            "--target=es2015".to_string(),
            "--sourcemap".to_string(),
            "--color=false".to_string(),
            format!("--outdir={}", spec.out_dir.display()),
            format!("--public-path={}", spec.public_url),
        ];
        if spec.minify {
            args.push("--minify".to_string());
        }
        for (key, value) in &spec.defines {
            args.push(format!("--define:{key}={value}"));
        }
        for (ext, loader) in &spec.loader {
            args.push(format!("--loader:{ext}={loader}"));
        }
        args
    }

    fn split_diagnostics(stderr: &str) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        for line in stderr.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if line.contains("[WARNING]") || line.to_ascii_lowercase().contains("warning:") {
                warnings.push(line.to_string());
            } else {
                errors.push(line.to_string());
            }
        }
        (warnings, errors)
    }
}

#[async_trait]
impl BuildEngine for CommandEngine {
    async fn build(&self, spec: &BundleSpec) -> Result<BuildReport, BuildFailure> {
        tracing::debug!(bundle = %spec.name, entry = %spec.entry.display(), "invoking bundler");

        let output = Command::new(&self.program)
            .args(Self::args_for(spec))
            .output()
            .await
            .map_err(|err| {
                BuildFailure::new(vec![format!(
                    "failed to run bundler '{}': {err}",
                    self.program
                )])
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let (warnings, mut errors) = Self::split_diagnostics(&stderr);

        if output.status.success() {
            // anything the bundler printed on a successful exit is a warning
            let mut all_warnings = warnings;
            all_warnings.append(&mut errors);
            Ok(BuildReport {
                warnings: all_warnings,
                errors: Vec::new(),
            })
        } else {
            if errors.is_empty() {
                errors.push(format!(
                    "bundler '{}' exited with {}",
                    self.program, output.status
                ));
            }
            Err(BuildFailure::new(errors))
        }
    }
}
