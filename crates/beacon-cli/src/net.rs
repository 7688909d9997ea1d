//! Network identity resolution: host, port, and browsable URLs.
//!
//! Port probing binds a test socket, so the whole resolution is
//! computed at most once per process: [`NetResolver`] wraps it in a
//! `tokio::sync::OnceCell`, which serializes concurrent first callers
//! onto a single computation. URL derivation itself is a pure function
//! and is unit-tested as one.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::net::TcpListener;
use tokio::sync::OnceCell;

use crate::error::{BuildError, Result};
use crate::ui;

/// How many ports above the preferred one are probed before giving up.
const PORT_PROBE_RANGE: u16 = 10;

/// Browser-facing URLs derived from the resolved identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsableUrls {
    /// URL for the local machine's browser.
    pub local: String,
    /// LAN-facing URL, when the host is an explicit routable address.
    pub lan: Option<String>,
}

/// Resolved once per process and cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub protocol: &'static str,
    pub host: String,
    pub port: u16,
    pub public_path: String,
    pub urls: BrowsableUrls,
}

/// Lazily-initialized, concurrency-safe network identity cell.
pub struct NetResolver {
    preferred_port: u16,
    https: bool,
    public_path: String,
    cell: OnceCell<NetworkIdentity>,
    probes: AtomicUsize,
}

impl NetResolver {
    pub fn new(preferred_port: u16, https: bool, public_path: impl Into<String>) -> Self {
        Self {
            preferred_port,
            https,
            public_path: public_path.into(),
            cell: OnceCell::new(),
            probes: AtomicUsize::new(0),
        }
    }

    /// Resolve host, port, and URLs, probing the network at most once
    /// even under concurrent first calls.
    pub async fn resolve(&self) -> Result<&NetworkIdentity> {
        self.cell
            .get_or_try_init(|| async {
                self.probes.fetch_add(1, Ordering::SeqCst);

                let host = resolve_host();
                let port = choose_port(&host, self.preferred_port).await?;
                let protocol = if self.https { "https" } else { "http" };
                let urls = prepare_urls(protocol, &host, port, &self.public_path);

                Ok(NetworkIdentity {
                    protocol,
                    host,
                    port,
                    public_path: self.public_path.clone(),
                    urls,
                })
            })
            .await
    }

    /// Number of times the underlying probe ran. Exactly one after any
    /// number of `resolve` calls.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

/// Resolve the bind host: the `HOST` override if set, else wildcard.
///
/// The override is a common source of confusing misconfiguration, so
/// it is called out loudly the one time it is read.
fn resolve_host() -> String {
    match std::env::var("HOST") {
        Ok(host) if !host.is_empty() => {
            ui::warning(&format!(
                "Attempting to bind to HOST environment variable: {host}"
            ));
            ui::warning("If this was unintentional, check that you haven't mistakenly set it in your shell.");
            host
        }
        _ => "0.0.0.0".to_string(),
    }
}

/// Find a free port at or above `preferred`.
///
/// Probes by binding a throwaway socket. Returns an explicit error once
/// the probe range is exhausted; never hangs.
async fn choose_port(host: &str, preferred: u16) -> Result<u16> {
    for offset in 0..=PORT_PROBE_RANGE {
        let port = preferred.saturating_add(offset);
        if TcpListener::bind((host, port)).await.is_ok() {
            if offset > 0 {
                ui::warning(&format!("Port {preferred} is busy, using port {port} instead"));
            }
            return Ok(port);
        }
    }

    Err(BuildError::PortUnavailable {
        start: preferred,
        end: preferred.saturating_add(PORT_PROBE_RANGE),
    }
    .into())
}

/// Derive browsable URLs. Pure function of its inputs.
///
/// A wildcard bind maps to `localhost` for the local URL and omits the
/// LAN URL rather than probing interfaces (which would be a side
/// effect this function must not have).
pub fn prepare_urls(protocol: &str, host: &str, port: u16, public_path: &str) -> BrowsableUrls {
    let is_wildcard = host == "0.0.0.0" || host == "::";
    let is_loopback = host == "localhost" || host == "127.0.0.1" || host == "::1";

    let local_host = if is_wildcard { "localhost" } else { host };
    let local = format!("{protocol}://{local_host}:{port}{public_path}");

    let lan = if is_wildcard || is_loopback {
        None
    } else {
        Some(format!("{protocol}://{host}:{port}{public_path}"))
    };

    BrowsableUrls { local, lan }
}
