//! Logging setup built on the `tracing` ecosystem.
//!
//! Verbosity is controlled by `--verbose` / `--quiet`, with `RUST_LOG`
//! honored when neither flag is set. Called once at startup, before any
//! logging occurs.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Level resolution order: `--verbose` (debug for beacon crates), then
/// `--quiet` (errors only), then `RUST_LOG`, then info.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("beacon=debug,beacon_cli=debug,beacon_config=debug")
    } else if quiet {
        EnvFilter::new("beacon=error,beacon_cli=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("beacon=info,beacon_cli=info,beacon_config=info"))
    };

    // CI logs are captured, not viewed live; escape codes only add noise
    let ansi = !no_color && !crate::ui::is_ci();
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(ansi)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
