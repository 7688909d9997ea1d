//! The optional `beacon.config.json` project file.
//!
//! A missing file is a normal, silent case: every field has a default.
//! A file that exists but does not parse is a diagnostic error, never a
//! silent fallback, so typos surface instead of being swallowed.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name probed in the project root.
pub const CONFIG_FILE_NAME: &str = "beacon.config.json";

/// Errors raised while loading the config file.
///
/// "File absent" is deliberately not an error; [`ConfigFile::load`]
/// returns `Ok(None)` for that case.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but is not valid JSON for the expected shape.
    #[error("malformed config file {}: {source}\n\nHint: check {CONFIG_FILE_NAME} syntax and field types", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file exists but could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parsed `beacon.config.json`.
///
/// All keys are optional; an empty file is equivalent to no file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// File-extension to bundler-loader overrides, e.g. `".svg": "file"`.
    #[serde(default)]
    pub loader: BTreeMap<String, String>,

    /// Extra environment values injected into the client build.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// URL path prefix to upstream proxy target.
    ///
    /// Declaration order is significant: the first matching prefix wins,
    /// which is why this is an `IndexMap` and not a hash map.
    #[serde(default)]
    pub proxy: IndexMap<String, ProxyTarget>,
}

/// One proxy upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyTarget {
    /// Upstream base URL, e.g. `http://localhost:8080`.
    pub target: String,

    /// Rewrite the `Host` header to the upstream's host.
    #[serde(default)]
    pub change_origin: bool,
}

impl ConfigFile {
    /// Load `beacon.config.json` from `dir`.
    ///
    /// Returns `Ok(None)` when the file does not exist. Any other
    /// failure (unreadable file, malformed JSON) is an error.
    pub fn load(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConfigError::Malformed { path, source })
    }
}
