//! [apps/server/src/handlers/ws.rs]
//! WebSocket upgrade endpoint: every probe connects here and is handed off
//! to the Probe Session state machine for the lifetime of the socket.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::session::run_probe_session;
use crate::state::AppState;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| run_probe_session(socket, state, shutdown))
}
