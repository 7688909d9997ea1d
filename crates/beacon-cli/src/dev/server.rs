//! The development server.
//!
//! Startup is deliberately sequential: resolve the network identity,
//! run the initial builds to completion, and only then bind the
//! listener. The first page load therefore always finds built output
//! on disk, and a broken project fails fast with the bundler's errors
//! instead of serving a half-working page.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use beacon_config::{ClientEnv, ConfigFile, ProjectPaths};

use crate::engine::{BuildEngine, BundleSpec};
use crate::error::{CliError, Result};
use crate::net::{BrowsableUrls, NetResolver};
use crate::ui;

use super::broadcast::Broadcaster;
use super::index_page::{self, IndexMode};
use super::orchestrator::BuildOrchestrator;
use super::proxy::{self, ProxyRoute};
use super::watcher::{FileWatcher, DEFAULT_DEBOUNCE_MS};
use super::{APP_BUNDLE, RUNTIME_BUNDLE};

/// Browser-side support runtime, compiled through the engine like any
/// other bundle.
const RUNTIME_SOURCE: &str = include_str!("../../assets/runtime/index.js");

/// Everything `start` needs, resolved by the command layer.
pub struct ServerOptions {
    pub preferred_port: u16,
    pub https: bool,
    pub push_state: bool,
    pub paths: ProjectPaths,
    pub config: ConfigFile,
}

/// State shared by the request handlers.
struct ServerState {
    broadcaster: Arc<Broadcaster>,
    routes: Vec<ProxyRoute>,
    http: reqwest::Client,
    app_out: PathBuf,
    runtime_out: PathBuf,
    public_dir: PathBuf,
    env: ClientEnv,
    app_script_url: String,
    push_state: bool,
}

impl ServerState {
    /// The index document, rendered fresh per request.
    fn index_html(&self) -> String {
        index_page::render_index(&self.env, IndexMode::Development, &self.app_script_url)
    }
}

/// A started dev server.
///
/// Dropping it tears everything down; [`RunningServer::shutdown`] does
/// so explicitly and is safe to call any number of times.
pub struct RunningServer {
    pub addr: SocketAddr,
    pub urls: BrowsableUrls,
    server_task: JoinHandle<()>,
    watch_tasks: Vec<JoinHandle<()>>,
    stop: Arc<Notify>,
    stopped: AtomicBool,
    _watchers: Vec<FileWatcher>,
    _work_dir: tempfile::TempDir,
}

impl RunningServer {
    /// Stop accepting connections and cancel the rebuild loop.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("shutting down development server");
        // notify_one stores a permit, so the signal is not lost if the
        // server task has not polled its shutdown future yet
        self.stop.notify_one();
        for task in &self.watch_tasks {
            task.abort();
        }
    }

    /// Wait for the server task to finish.
    pub async fn wait(self) {
        let _ = self.server_task.await;
    }
}

pub struct DevServer {
    options: ServerOptions,
    engine: Arc<dyn BuildEngine>,
}

impl DevServer {
    pub fn new(options: ServerOptions, engine: Arc<dyn BuildEngine>) -> Self {
        Self { options, engine }
    }

    /// Build everything, then serve.
    pub async fn start(self) -> Result<RunningServer> {
        let ServerOptions {
            preferred_port,
            https,
            push_state,
            paths,
            config,
        } = self.options;

        let resolver = NetResolver::new(preferred_port, https, "/");
        let identity = resolver.resolve().await?.clone();

        ui::clear_terminal();
        ui::info("Starting the development server...");

        // Scratch space: bundler output plus the runtime's entry file.
        let work_dir = tempfile::tempdir()?;
        let app_out = work_dir.path().join("app");
        let runtime_out = work_dir.path().join("runtime");
        let runtime_src = work_dir.path().join("runtime-src");
        for dir in [&app_out, &runtime_out, &runtime_src] {
            std::fs::create_dir_all(dir)?;
        }
        let runtime_entry = runtime_src.join("index.js");
        std::fs::write(&runtime_entry, RUNTIME_SOURCE)?;

        let env = ClientEnv::gather("/", "development", &config.env);
        let app_entry = paths.app_entry()?;
        let app_script_url = index_page::app_script_url(&app_entry);

        let mut app_spec = BundleSpec::new(APP_BUNDLE, app_entry, app_out.clone());
        app_spec.defines = env.stringified();
        app_spec.loader = config.loader.clone();

        let runtime_spec = BundleSpec::new(RUNTIME_BUNDLE, runtime_entry, runtime_out.clone());

        let broadcaster = Arc::new(Broadcaster::new());
        let runtime_orch = Arc::new(BuildOrchestrator::new(
            runtime_spec,
            Arc::clone(&self.engine),
            Arc::clone(&broadcaster),
        ));
        let app_orch = Arc::new(BuildOrchestrator::new(
            app_spec,
            Arc::clone(&self.engine),
            Arc::clone(&broadcaster),
        ));

        // Initial builds block startup. The runtime first: the app build
        // is the one developers wait on, so its diagnostics come last.
        runtime_orch.initial_build().await?;
        app_orch.initial_build().await?;

        // The runtime's sources live in the scratch dir and are watched
        // too, so both bundles are in watch mode before the listener
        // binds.
        let (runtime_watcher, runtime_changes) =
            FileWatcher::new(runtime_src, DEFAULT_DEBOUNCE_MS)?;
        let (app_watcher, app_changes) =
            FileWatcher::new(paths.root().to_path_buf(), DEFAULT_DEBOUNCE_MS)?;
        let watch_tasks = vec![
            Arc::clone(&runtime_orch).spawn_watch(runtime_changes),
            Arc::clone(&app_orch).spawn_watch(app_changes),
        ];

        let state = Arc::new(ServerState {
            broadcaster,
            routes: ProxyRoute::from_config(&config),
            http: reqwest::Client::new(),
            app_out,
            runtime_out,
            public_dir: paths.public_dir(),
            env,
            app_script_url,
            push_state,
        });

        let listener = tokio::net::TcpListener::bind((identity.host.as_str(), identity.port))
            .await
            .map_err(|err| {
                CliError::Server(format!(
                    "failed to bind to {}:{}: {err}",
                    identity.host, identity.port
                ))
            })?;
        let addr = listener
            .local_addr()
            .map_err(|err| CliError::Server(format!("failed to read local address: {err}")))?;

        ui::success(&format!(
            "Development server running at {}",
            identity.urls.local
        ));
        if let Some(lan) = &identity.urls.lan {
            ui::info(&format!("On your network: {lan}"));
        }

        let stop = Arc::new(Notify::new());
        let stop_signal = Arc::clone(&stop);
        let router = build_router(Arc::clone(&state));
        let server_task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop_signal.notified().await })
                .await;
            if let Err(err) = result {
                tracing::error!("server error: {err}");
            }
        });

        Ok(RunningServer {
            addr,
            urls: identity.urls,
            server_task,
            watch_tasks,
            stop,
            stopped: AtomicBool::new(false),
            _watchers: vec![runtime_watcher, app_watcher],
            _work_dir: work_dir,
        })
    }
}

fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/_ws", get(handle_ws))
        .route("/__open_editor", get(handle_open_editor))
        .route("/favicon.ico", get(handle_favicon))
        .fallback(handle_request)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Upgrade to the build-status push channel.
async fn handle_ws(
    State(state): State<Arc<ServerState>>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| push_channel(state, socket))
}

async fn push_channel(state: Arc<ServerState>, socket: WebSocket) {
    let (id, mut rx) = state.broadcaster.register();
    tracing::debug!("client {id} connected to push channel");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            status = rx.recv() => {
                let Some(json) = status else { break };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                // clients never send payloads; anything but a frame we
                // can ignore means the tab went away
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.broadcaster.unregister(id);
    tracing::debug!("client {id} disconnected from push channel");
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenEditorQuery {
    file_name: String,
    line_number: Option<u32>,
    #[allow(dead_code)]
    col_number: Option<u32>,
}

/// Open the named file in the developer's editor.
///
/// Fire-and-forget: the response never waits on the editor, and a
/// missing `$VISUAL`/`$EDITOR` is not an error.
async fn handle_open_editor(Query(query): Query<OpenEditorQuery>) -> impl IntoResponse {
    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .ok();

    match editor {
        Some(editor) => {
            let mut cmd = tokio::process::Command::new(&editor);
            match query.line_number {
                // the +line convention most terminal editors accept
                Some(line) => cmd.arg(format!("+{line}")).arg(&query.file_name),
                None => cmd.arg(&query.file_name),
            };
            if let Err(err) = cmd.spawn() {
                tracing::warn!("failed to launch editor {editor}: {err}");
            }
        }
        None => {
            tracing::debug!("no VISUAL or EDITOR set, ignoring open-editor request");
        }
    }

    StatusCode::NO_CONTENT
}

async fn handle_favicon() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

/// Everything else: index, proxy, built output, public assets, SPA
/// fallback, 404 - in that order.
async fn handle_request(
    State(state): State<Arc<ServerState>>,
    req: Request<Body>,
) -> Response<Body> {
    let path = req.uri().path().to_string();

    if path == "/" {
        return html_response(state.index_html());
    }

    if let Some(rest) = path.strip_prefix("/_runtime/") {
        if let Some(resp) = serve_file(&state.runtime_out, rest).await {
            return resp;
        }
        return not_found(&path);
    }

    if let Some(route) = ProxyRoute::match_route(&state.routes, &path) {
        let route = route.clone();
        return match proxy::forward(&state.http, &route, req).await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::error!("proxy failure for {path}: {err}");
                status_response(StatusCode::BAD_GATEWAY, "proxy failure")
            }
        };
    }

    let rel = path.trim_start_matches('/');
    if let Some(resp) = serve_file(&state.app_out, rel).await {
        return resp;
    }
    if let Some(resp) = serve_file(&state.public_dir, rel).await {
        return resp;
    }

    // history-API routing: unknown paths get the application shell
    if state.push_state && !path.contains('.') {
        return html_response(state.index_html());
    }

    not_found(&path)
}

/// Serve one file from under `root`, or `None` if it is not there.
///
/// Rejects any path that could escape the root.
async fn serve_file(root: &Path, rel: &str) -> Option<Response<Body>> {
    if rel
        .split('/')
        .any(|segment| segment == ".." || segment.is_empty())
    {
        return None;
    }

    let file = root.join(rel);
    if !file.is_file() {
        return None;
    }

    match tokio::fs::read(&file).await {
        Ok(content) => {
            let builder = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, determine_content_type(rel))
                .header(header::CACHE_CONTROL, "no-cache");
            builder.body(Body::from(content)).ok()
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}", file.display());
            None
        }
    }
}

fn html_response(html: String) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from(html))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn status_response(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(message.to_string()))
        .unwrap_or_else(|_| status.into_response())
}

fn not_found(path: &str) -> Response<Body> {
    status_response(StatusCode::NOT_FOUND, &format!("File not found: {path}"))
}

/// Content type from the file extension.
fn determine_content_type(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "txt" => "text/plain",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
