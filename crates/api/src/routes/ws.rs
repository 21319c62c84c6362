use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use tracing::{debug, warn};

use crate::AppState;

const PUSH_INTERVAL: Duration = Duration::from_secs(1);

pub fn ws_router() -> Router<AppState> {
    Router::new().route("/ws/dashboard", get(ws_dashboard_handler))
}

/// WebSocket endpoint that pushes the dashboard view once per second.
async fn ws_dashboard_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    let mut ticker = tokio::time::interval(PUSH_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let connection = state.feed.connection_state();
                let view = state.dashboard.read().await.view(connection);
                let text = match serde_json::to_string(&view) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode dashboard view");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Dashboard WebSocket client disconnected");
}
