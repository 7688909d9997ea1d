//! Command-line interface definition.
//!
//! Two subcommands: `beacon start` runs the development server,
//! `beacon build` produces a one-shot production build.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Beacon - front-end development server with live reload
#[derive(Parser, Debug)]
#[command(
    name = "beacon",
    version,
    about = "Front-end development server with live reload",
    long_about = "Beacon compiles your application through an external bundler, serves it\n\
                  over HTTP, and pushes live-reload notifications to connected browsers\n\
                  as source changes are rebuilt."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Builds the application, serves it, watches for changes, and pushes
    /// rebuild status to connected browsers over a persistent channel.
    Start(StartArgs),

    /// Create an optimized production build
    ///
    /// Runs a single build with minification and writes the result plus the
    /// generated index document to the build directory.
    Build(BuildArgs),
}

/// Arguments for the start command
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Preferred port for the development server
    ///
    /// Falls back to the PORT environment variable, then 3000. If the
    /// port is busy the server probes upward for a nearby free one.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Serve the application shell for unmatched paths
    ///
    /// Enables history-API fallback so client-side routers can handle
    /// deep links. Without this flag unmatched paths return 404.
    #[arg(long = "push-state")]
    pub push_state: bool,

    /// Open the browser automatically on server start
    #[arg(long)]
    pub open: bool,

    /// Project root directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Project root directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_start_defaults() {
        let cli = Cli::parse_from(["beacon", "start"]);
        match cli.command {
            Command::Start(args) => {
                assert!(args.port.is_none());
                assert!(!args.push_state);
                assert!(!args.open);
            }
            _ => panic!("expected start command"),
        }
    }

    #[test]
    fn test_start_with_flags() {
        let cli = Cli::parse_from(["beacon", "start", "--port", "4000", "--push-state"]);
        match cli.command {
            Command::Start(args) => {
                assert_eq!(args.port, Some(4000));
                assert!(args.push_state);
            }
            _ => panic!("expected start command"),
        }
    }

    #[test]
    fn test_global_flags_conflict() {
        let result = Cli::try_parse_from(["beacon", "start", "--verbose", "--quiet"]);
        assert!(result.is_err());
    }
}
