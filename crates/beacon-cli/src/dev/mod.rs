//! The development server.
//!
//! - live reload over a persistent WebSocket push channel
//! - per-bundle build orchestration with blocking initial builds
//! - file watching with debouncing
//! - proxy routing and SPA history fallback
//! - error overlay in the browser

pub mod broadcast;
pub mod client;
pub mod index_page;
pub mod orchestrator;
pub mod protocol;
pub mod proxy;
pub mod server;
pub mod watcher;

pub use broadcast::Broadcaster;
pub use client::{ClientAction, ReloadClient};
pub use orchestrator::{BuildOrchestrator, BuildPhase};
pub use protocol::BuildStatus;
pub use proxy::ProxyRoute;
pub use server::{DevServer, RunningServer, ServerOptions};
pub use watcher::FileWatcher;

/// Name of the support runtime bundle.
pub const RUNTIME_BUNDLE: &str = "runtime";

/// Name of the application bundle.
pub const APP_BUNDLE: &str = "app";
