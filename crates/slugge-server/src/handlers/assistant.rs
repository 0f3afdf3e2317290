use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::connection;
use crate::state::AppState;

/// WebSocket upgrade for assistant sessions.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let client_id = state.connections.register();
        tracing::info!(client_id = %client_id, "assistant client connected");

        connection::handle_ws_connection(
            socket,
            client_id,
            Arc::clone(&state.connections),
            Arc::clone(&state.assistant),
            state.config.heartbeat_interval,
        )
        .await;
    })
}
