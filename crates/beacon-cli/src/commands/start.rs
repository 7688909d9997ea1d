//! The `beacon start` command.
//!
//! Resolves the project, starts the dev server, optionally opens the
//! browser, and then waits for a shutdown signal: Ctrl-C, SIGTERM, or
//! (outside CI) the parent process closing stdin.

use std::sync::Arc;

use beacon_config::{ConfigFile, ProjectPaths};
use tokio::io::AsyncReadExt;

use crate::cli::StartArgs;
use crate::dev::{DevServer, ServerOptions};
use crate::engine::CommandEngine;
use crate::error::{CliError, Result};
use crate::ui;

/// Default port when neither `--port` nor `PORT` is set.
const DEFAULT_PORT: u16 = 3000;

pub async fn run(args: StartArgs) -> Result<()> {
    let root = super::resolve_project_root(args.cwd)?;
    let paths = ProjectPaths::new(&root);
    paths.check_required_files()?;

    let config = ConfigFile::load(&root)?.unwrap_or_default();
    let port = resolve_port(args.port)?;
    let https = std::env::var("HTTPS").map(|v| v == "true").unwrap_or(false);

    let engine = Arc::new(CommandEngine::from_env());
    let server = DevServer::new(
        ServerOptions {
            preferred_port: port,
            https,
            push_state: args.push_state,
            paths,
            config,
        },
        engine,
    )
    .start()
    .await?;

    if args.open && !ui::is_ci() {
        open_browser(&server.urls.local);
    }

    wait_for_shutdown().await;
    server.shutdown();
    server.wait().await;
    ui::info("Development server stopped");
    Ok(())
}

/// Port preference order: `--port`, then `PORT`, then the default.
fn resolve_port(flag: Option<u16>) -> Result<u16> {
    if let Some(port) = flag {
        return Ok(port);
    }
    match std::env::var("PORT") {
        Ok(raw) => raw
            .parse()
            .map_err(|_| CliError::InvalidArgument(format!("PORT is not a valid port: {raw}"))),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

/// Block until any shutdown condition fires.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    // CI runners close stdin immediately, which would shut the server
    // down before it serves a single request.
    let stdin_eof = async {
        if ui::is_ci() {
            std::future::pending::<()>().await;
        }
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 1024];
        loop {
            match stdin.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::debug!("received Ctrl-C"),
        _ = terminate => tracing::debug!("received SIGTERM"),
        _ = stdin_eof => tracing::debug!("stdin closed"),
    }
}

/// Open the default browser at `url`. Failure is only logged; the
/// server does not depend on it.
fn open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd")
        .args(["/C", "start", "", url])
        .spawn();
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = std::process::Command::new("xdg-open").arg(url).spawn();

    if let Err(err) = result {
        tracing::debug!("failed to open browser: {err}");
    }
}
