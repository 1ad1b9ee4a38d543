use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
};
use uuid::Uuid;

use crate::state::AppState;
use crate::ws::actor;

/// GET /ws
/// WebSocket upgrade endpoint. The connection starts Unjoined; identity and
/// authorization arrive with the first `join` event (agents present their
/// access key there), so the upgrade itself is unauthenticated.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let conn_id = Uuid::new_v4();
    tracing::info!(connection_id = %conn_id, "New client connected");
    ws.on_upgrade(move |socket| actor::run_connection(socket, state, conn_id))
}
