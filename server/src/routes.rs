use axum::{routing::get, Json, Router};
use serde_json::json;

use crate::state::AppState;
use crate::ws::handler;

/// Build the axum router: the WebSocket endpoint plus a health probe.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(handler::ws_upgrade))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
