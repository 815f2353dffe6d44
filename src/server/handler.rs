//! Metadata and health endpoints
//!
//! Requests are routed on the final path segment, so the handler can be
//! mounted under any base path:
//! - `info` - build metadata as JSON
//! - `alive` - liveness registry
//! - `ready` - readiness registry
//! - `ping` - literal `pong`

use crate::health::Registry;
use crate::info::Info;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Conventional mount point for the handler
pub const BASE_PATH: &str = "/-/";
pub const INFO_PATH: &str = "info";
pub const ALIVE_PATH: &str = "alive";
pub const PING_PATH: &str = "ping";
pub const READY_PATH: &str = "ready";

/// Serves build metadata alongside liveness and readiness checks
///
/// The metadata is captured once at construction. Register liveness checks in
/// [`alive`](Self::alive) and readiness checks in [`ready`](Self::ready); both
/// can be extended while serving.
#[derive(Clone)]
pub struct MetaHandler {
    pub info: Arc<Info>,
    pub alive: Registry,
    pub ready: Registry,
}

impl MetaHandler {
    /// Handler for the running process's own build metadata
    pub fn new() -> Self {
        Self::with_info(Info::current())
    }

    /// Handler serving `info`, with empty check registries
    pub fn with_info(info: Info) -> Self {
        Self {
            info: Arc::new(info),
            alive: Registry::new(),
            ready: Registry::new(),
        }
    }

    /// Router answering every path through [`MetaHandler::dispatch`]
    ///
    /// Nest it under [`BASE_PATH`] or any other prefix.
    pub fn router(&self) -> Router {
        Router::new().fallback(dispatch).with_state(self.clone())
    }

    /// Route a request path to its endpoint
    pub async fn dispatch(&self, path: &str) -> Response {
        match final_segment(path) {
            INFO_PATH => Json(self.info.as_ref()).into_response(),
            ALIVE_PATH => self.alive.respond().await,
            PING_PATH => "pong".into_response(),
            READY_PATH => self.ready.respond().await,
            _ => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        }
    }
}

impl Default for MetaHandler {
    fn default() -> Self {
        Self::new()
    }
}

async fn dispatch(State(handler): State<MetaHandler>, uri: Uri) -> Response {
    handler.dispatch(uri.path()).await
}

/// Last non-empty path segment; `/-/info/` and `/info` both yield `info`
pub(super) fn final_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}

/// Run the metadata server on `addr`
///
/// Every path is routed on its final segment, so both `/-/ready` and `/ready`
/// reach the readiness registry. Runs until the server is shut down.
pub async fn run_meta_server(addr: SocketAddr, handler: MetaHandler) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, handler).await
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, handler: MetaHandler) -> Result<(), std::io::Error> {
    let app = handler.router();

    // Log after successful bind - server is actually listening
    info!(addr = %listener.local_addr()?, "Meta server listening");

    axum::serve(listener, app)
        .await
        .map_err(std::io::Error::other)
}
