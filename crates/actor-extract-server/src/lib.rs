//! REST API server for actor extraction
//!
//! - `POST /api/v1/upload`: multipart upload (field `file`) of a zip archive;
//!   responds with the extracted actors, plus per-entry reports when called
//!   with `?diagnostics=true`
//! - `GET /api/v1/health`: liveness and effective limits

pub mod config;
mod error;
mod handlers;
mod types;

use std::sync::Arc;

use actor_extract_core::ActorExtractor;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, INTERNAL_ERROR_DETAIL};
pub use handlers::*;
pub use types::*;

/// Room for multipart boundaries and part headers on top of the file limit
pub const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// API server state shared across handlers
#[derive(Clone, Debug)]
pub struct ApiState {
    /// Extractor owning the shared decode pool
    pub extractor: Arc<ActorExtractor>,
}

impl ApiState {
    #[must_use]
    pub fn new(extractor: ActorExtractor) -> Self {
        Self {
            extractor: Arc::new(extractor),
        }
    }

    /// Largest request body the upload route accepts.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        let limit = self
            .extractor
            .config()
            .max_file_size
            .saturating_add(MULTIPART_OVERHEAD);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    let body_limit = state.body_limit();
    Router::new()
        .route("/api/v1/health", get(health_check))
        .route(
            "/api/v1/upload",
            post(upload_archive).layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, state: ApiState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on {addr}");
    }
    axum::serve(listener, build_router(state)).await
}

/// Start the API server
pub async fn start_server<A>(addr: A, state: ApiState) -> Result<(), std::io::Error>
where
    A: ToSocketAddrs + std::fmt::Display,
{
    tracing::info!("Starting API server on {addr}");
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state).await
}
