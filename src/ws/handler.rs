use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::ClientMessage;
use crate::state::AppState;
use crate::ws::session::SessionCtx;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle one WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    // The connection id is also the member id inside any room joined on
    // this socket.
    let conn_id = Uuid::new_v4().to_string();
    info!("WebSocket connection established: {}", conn_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Outbound path: everything addressed to this connection is queued
    // on the channel, serialized and written by one task. Handlers never
    // write to the socket directly.
    let (tx, mut rx) = mpsc::unbounded_channel();
    app_state.registry.register(conn_id.clone(), tx).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let ctx = SessionCtx::new(conn_id.clone(), app_state.clone());
    let loop_ctx = ctx.clone();
    let mut recv_task = tokio::spawn(async move {
        // Only text frames carry protocol messages; anything else is
        // skipped until the stream ends.
        while let Some(Ok(Message::Text(msg))) = ws_receiver.next().await {
            let parsed: ClientMessage = match serde_json::from_str(&msg) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("Failed to parse message from {}: {}", loop_ctx.conn_id, e);
                    continue;
                }
            };
            loop_ctx.dispatch(parsed).await;
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Same teardown whether the client left cleanly or the socket died.
    ctx.disconnect().await;
    app_state.registry.unregister(&conn_id).await;
    info!("WebSocket connection terminated: {}", conn_id);
}
