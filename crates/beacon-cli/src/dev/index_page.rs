//! Generation of the served index document.
//!
//! The dev server and the production build both emit the same skeleton:
//! a root mount node, the inlined client environment, and the module
//! script for the application entry. Development additionally loads the
//! live-reload support runtime.

use std::path::Path;

use beacon_config::ClientEnv;

/// Global the inlined environment object is assigned to.
pub const ENV_GLOBAL: &str = "__BEACON_ENV__";

/// URL the support runtime bundle is served under in development.
pub const RUNTIME_SCRIPT_URL: &str = "/_runtime/index.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    Development,
    Production,
}

/// URL the built application entry is served under, derived from the
/// entry file's stem (`src/index.tsx` becomes `/index.js`).
pub fn app_script_url(entry: &Path) -> String {
    let stem = entry
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");
    format!("/{stem}.js")
}

/// Render the index document.
///
/// `app_script_url` is the URL of the built application entry, e.g.
/// `/index.js`.
pub fn render_index(env: &ClientEnv, mode: IndexMode, app_script_url: &str) -> String {
    let mut html = String::with_capacity(1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>Beacon App</title>\n");
    html.push_str("</head>\n<body>\n");
    html.push_str("<div id=\"root\"></div>\n");

    html.push_str(&format!(
        "<script>window.{ENV_GLOBAL} = {};</script>\n",
        env.to_json()
    ));

    if mode == IndexMode::Development {
        html.push_str(&format!(
            "<script type=\"module\" src=\"{RUNTIME_SCRIPT_URL}\"></script>\n"
        ));
    }

    html.push_str(&format!(
        "<script type=\"module\" src=\"{app_script_url}\"></script>\n"
    ));
    html.push_str("</body>\n</html>\n");
    html
}
