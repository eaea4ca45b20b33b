//! HTTP surface.
//!
//! Routes:
//!
//! ```text
//! GET  /                                  single-page UI
//! GET  /health                            liveness probe
//! POST /api/sessions                      create a session
//! POST /api/sessions/{id}/documents       upload PDFs (multipart)
//! POST /api/sessions/{id}/ask             ask a question (JSON)
//! ```
//!
//! Handlers stay thin: resolve the session, hand off to the service, map
//! errors onto statuses through [`ApiError`].

mod handlers;

pub use handlers::ApiError;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::service::ShelfService;
use crate::session::SessionManager;

/// Uploads carry whole PDFs; the axum default of 2 MiB is far too small.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ShelfService>,
    pub sessions: Arc<SessionManager>,
}

/// Builds the application router.
pub fn router(service: Arc<ShelfService>, sessions: Arc<SessionManager>) -> Router {
    let state = AppState { service, sessions };
    Router::new()
        .route("/", get(handlers::index_page))
        .route("/health", get(handlers::health))
        .route("/api/sessions", post(handlers::create_session))
        .route(
            "/api/sessions/{session_id}/documents",
            post(handlers::upload_documents),
        )
        .route("/api/sessions/{session_id}/ask", post(handlers::ask))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
