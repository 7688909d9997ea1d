//! Typed configuration for the beacon development server.
//!
//! Three concerns live here:
//!
//! - [`file`] - the optional `beacon.config.json` project file with its
//!   `loader`, `env`, and `proxy` keys
//! - [`env`] - the client environment injected into builds and the
//!   generated index document
//! - [`paths`] - project path resolution and required-file checks

pub mod env;
pub mod file;
pub mod paths;

pub use env::ClientEnv;
pub use file::{ConfigError, ConfigFile, ProxyTarget, CONFIG_FILE_NAME};
pub use paths::{PathsError, ProjectPaths, MODULE_EXTENSIONS};
