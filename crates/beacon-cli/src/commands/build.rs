//! The `beacon build` command.
//!
//! One-shot production build: clean the build directory, copy static
//! assets, run the bundler with minification, and write the generated
//! index document. Exits non-zero if the bundler reports errors.

use std::path::Path;
use std::sync::Arc;

use beacon_config::{ClientEnv, ConfigFile, ProjectPaths};

use crate::cli::BuildArgs;
use crate::dev::index_page::{self, IndexMode};
use crate::dev::APP_BUNDLE;
use crate::engine::{BuildEngine, BundleSpec, CommandEngine};
use crate::error::{BuildError, Result};
use crate::ui;

pub async fn run(args: BuildArgs) -> Result<()> {
    let root = super::resolve_project_root(args.cwd)?;
    let paths = ProjectPaths::new(&root);
    paths.check_required_files()?;

    let config = ConfigFile::load(&root)?.unwrap_or_default();
    let env = ClientEnv::gather("/", "production", &config.env);

    let build_dir = paths.build_dir();
    if build_dir.exists() {
        std::fs::remove_dir_all(&build_dir)?;
    }
    std::fs::create_dir_all(&build_dir)?;

    // index.html is generated below, never copied
    copy_dir_filtered(&paths.public_dir(), &build_dir, "index.html")?;

    let app_entry = paths.app_entry()?;
    let mut spec = BundleSpec::new(APP_BUNDLE, app_entry.clone(), build_dir.clone());
    spec.defines = env.stringified();
    spec.loader = config.loader.clone();
    spec.minify = true;

    ui::info("Creating an optimized production build...");
    let engine: Arc<dyn BuildEngine> = Arc::new(CommandEngine::from_env());
    let report = match engine.build(&spec).await {
        Ok(report) => report,
        Err(failure) => {
            for error in &failure.errors {
                ui::error(error);
            }
            return Err(BuildError::InitialBuild {
                bundle: APP_BUNDLE.to_string(),
                errors: failure.errors,
            }
            .into());
        }
    };
    for warning in &report.warnings {
        ui::warning(warning);
    }

    let html = index_page::render_index(
        &env,
        IndexMode::Production,
        &index_page::app_script_url(&app_entry),
    );
    std::fs::write(build_dir.join("index.html"), html)?;

    ui::success("Compiled successfully.");
    ui::info(&format!("Output written to {}", build_dir.display()));
    Ok(())
}

/// Recursively copy `src` into `dst`, skipping one top-level file name.
fn copy_dir_filtered(src: &Path, dst: &Path, skip: &str) -> Result<()> {
    copy_dir_inner(src, dst, Some(skip))
}

fn copy_dir_inner(src: &Path, dst: &Path, skip: Option<&str>) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if skip.is_some_and(|s| name == *s) {
            continue;
        }

        let from = entry.path();
        let to = dst.join(&name);
        if entry.file_type()?.is_dir() {
            copy_dir_inner(&from, &to, None)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}
