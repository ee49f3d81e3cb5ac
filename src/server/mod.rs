// src/server/mod.rs

//! Live-preview HTTP server.
//!
//! Serves the build root, injects the reload client into HTML pages and
//! pushes [`ReloadMessage`]s to browsers over `/__livereload`.

pub mod reload;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::config::model::ServerSection;
use crate::errors::{PipelineError, Result};

pub use reload::{inject_reload_script, ReloadHub, ReloadMessage};

/// Largest HTML page rewritten with the reload script.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

/// Build the router for a build root.
pub fn router(build_root: impl Into<PathBuf>, hub: ReloadHub) -> Router {
    Router::new()
        .route("/__livereload", get(livereload_socket))
        .route("/__livereload.js", get(livereload_script))
        .fallback_service(ServeDir::new(build_root.into()))
        .layer(middleware::map_response(inject_into_html))
        .with_state(hub)
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub task: JoinHandle<()>,
}

/// Bind `host:port` and serve until `cancel` fires.
pub async fn start_server(
    cfg: &ServerSection,
    build_root: impl Into<PathBuf>,
    hub: ReloadHub,
    cancel: CancellationToken,
) -> Result<ServerHandle> {
    let bind = format!("{}:{}", cfg.host, cfg.port);
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| PipelineError::Config(format!("cannot bind web server to {bind}: {e}")))?;
    let addr = listener.local_addr()?;

    let prefix = cfg.log_prefix.clone();
    let build_root = build_root.into();
    info!(prefix = %prefix, root = ?build_root, "serving at http://{addr}");
    if cfg.tunnel {
        info!(prefix = %prefix, "tunnel requested; serving on the local address only");
    }

    let app = router(build_root, hub);
    let task = tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                info!(prefix = %prefix, "web server shutting down");
            })
            .await;
        if let Err(e) = served {
            warn!(error = %e, "web server stopped with an error");
        }
    });

    Ok(ServerHandle { addr, task })
}

async fn livereload_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        reload::RELOAD_CLIENT_JS,
    )
}

async fn livereload_socket(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> Response {
    let rx = hub.subscribe();
    ws.on_upgrade(move |socket| client_loop(socket, rx))
}

async fn client_loop(
    mut socket: WebSocket,
    mut rx: tokio::sync::broadcast::Receiver<ReloadMessage>,
) {
    debug!("live-reload client connected");
    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(msg) => {
                    let Ok(text) = serde_json::to_string(&msg) else {
                        continue;
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "live-reload client lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("live-reload client disconnected");
}

async fn inject_into_html(response: Response) -> Response {
    if response.status() != StatusCode::OK {
        return response;
    }
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "could not buffer HTML response for reload injection");
            return Response::from_parts(parts, Body::empty());
        }
    };
    let Ok(html) = std::str::from_utf8(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };

    let injected = inject_reload_script(html);
    parts.headers.remove(header::CONTENT_LENGTH);
    if let Ok(len) = HeaderValue::from_str(&injected.len().to_string()) {
        parts.headers.insert(header::CONTENT_LENGTH, len);
    }
    Response::from_parts(parts, Body::from(injected))
}
