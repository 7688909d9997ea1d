//! Client environment assembly.
//!
//! Collects the environment values exposed to the browser: `NODE_ENV`,
//! `PUBLIC_URL`, any process variable prefixed with `BEACON_APP_`, and
//! extra values from the config file's `env` key. The raw map feeds the
//! generated index document; the stringified map feeds the bundler's
//! define table.

use std::collections::BTreeMap;

use serde::Serialize;

/// Process-variable prefix exposed to the client bundle.
pub const CLIENT_ENV_PREFIX: &str = "BEACON_APP_";

/// Resolved client environment.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClientEnv {
    /// Plain key/value view, injected into the index document.
    pub raw: BTreeMap<String, String>,
}

impl ClientEnv {
    /// Gather the client environment.
    ///
    /// `node_env` is `"development"` for the dev server and
    /// `"production"` for one-shot builds. Config-file extras win over
    /// process variables of the same name.
    pub fn gather(public_url: &str, node_env: &str, extra: &BTreeMap<String, String>) -> Self {
        let mut raw = BTreeMap::new();

        for (key, value) in std::env::vars() {
            if key.starts_with(CLIENT_ENV_PREFIX) {
                raw.insert(key, value);
            }
        }

        raw.insert("NODE_ENV".to_string(), node_env.to_string());
        raw.insert("PUBLIC_URL".to_string(), public_url.to_string());

        for (key, value) in extra {
            raw.insert(key.clone(), value.clone());
        }

        Self { raw }
    }

    /// Define-table view: `process.env.KEY` mapped to a JSON string
    /// literal, the shape bundler `--define` flags expect.
    pub fn stringified(&self) -> BTreeMap<String, String> {
        self.raw
            .iter()
            .map(|(key, value)| {
                (
                    format!("process.env.{key}"),
                    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string()),
                )
            })
            .collect()
    }

    /// JSON document of the raw map, for inlining into the index page.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.raw).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_sets_node_env_and_public_url() {
        let env = ClientEnv::gather("/", "development", &BTreeMap::new());
        assert_eq!(env.raw.get("NODE_ENV").map(String::as_str), Some("development"));
        assert_eq!(env.raw.get("PUBLIC_URL").map(String::as_str), Some("/"));
    }

    #[test]
    fn test_config_extras_override_defaults() {
        let mut extra = BTreeMap::new();
        extra.insert("NODE_ENV".to_string(), "test".to_string());
        extra.insert("FEATURE_FLAG".to_string(), "on".to_string());

        let env = ClientEnv::gather("/", "development", &extra);
        assert_eq!(env.raw.get("NODE_ENV").map(String::as_str), Some("test"));
        assert_eq!(env.raw.get("FEATURE_FLAG").map(String::as_str), Some("on"));
    }

    #[test]
    fn test_stringified_quotes_values() {
        let mut extra = BTreeMap::new();
        extra.insert("GREETING".to_string(), "hello \"world\"".to_string());

        let env = ClientEnv::gather("/", "production", &extra);
        let defines = env.stringified();
        assert_eq!(
            defines.get("process.env.GREETING").map(String::as_str),
            Some(r#""hello \"world\"""#)
        );
        assert_eq!(
            defines.get("process.env.NODE_ENV").map(String::as_str),
            Some(r#""production""#)
        );
    }

    #[test]
    fn test_to_json_is_an_object() {
        let env = ClientEnv::gather("/", "development", &BTreeMap::new());
        let json: serde_json::Value = serde_json::from_str(&env.to_json()).unwrap();
        assert!(json.is_object());
        assert_eq!(json["PUBLIC_URL"], "/");
    }
}
