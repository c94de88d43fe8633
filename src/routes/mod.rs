//! Router assembly.
//!
//! The websocket endpoint carries all collaboration traffic; HTTP is limited
//! to the read-only stats endpoint, a health check, and optional static
//! client files.

pub mod ws;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router, extract::State};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::registry::RegistryStats;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/api/stats", get(stats))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state);

    match static_dir {
        Some(dir) => {
            router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => router,
    }
}

/// Room count plus per-room member and operation counts. No side effects.
async fn stats(State(state): State<AppState>) -> Json<RegistryStats> {
    Json(state.registry.stats().await)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
