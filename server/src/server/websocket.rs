use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::app::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Only forward batch events of this pipeline.
    pub pipeline: Option<String>,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.pipeline))
}

/// Whether a broadcast message should reach a client subscribed to `pipeline`.
///
/// Messages without a `data.pipelineId` (pongs, notices) always pass.
fn passes_filter(msg: &str, pipeline: Option<&str>) -> bool {
    let Some(wanted) = pipeline else {
        return true;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(msg) else {
        return true;
    };
    match value["data"]["pipelineId"].as_str() {
        Some(id) => id == wanted,
        None => true,
    }
}

async fn handle_socket(socket: WebSocket, state: SharedState, pipeline: Option<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.subscribe_ws();

    // Send connection confirmation
    let client_id = uuid::Uuid::new_v4().to_string();
    let welcome = serde_json::json!({
        "type": "connected",
        "data": { "clientId": client_id }
    });
    if sender
        .send(Message::Text(welcome.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    tracing::info!(client = %client_id, pipeline = ?pipeline, "WebSocket client connected");

    // Forward broadcast messages to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if !passes_filter(&msg, pipeline.as_deref()) {
                        continue;
                    }
                    if sender.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket client lagging, events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let ws_tx = state.ws_sender().clone();
    let cid = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_client_message(&text, &ws_tx);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        tracing::info!(client = %cid, "WebSocket client disconnected");
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

/// Route incoming client messages. Progress flows one way, so only
/// application-level pings are answered.
fn handle_client_message(text: &str, ws_tx: &tokio::sync::broadcast::Sender<String>) {
    let Ok(msg) = serde_json::from_str::<serde_json::Value>(text) else {
        tracing::debug!("Ignoring non-JSON WebSocket message");
        return;
    };
    match msg.get("type").and_then(|t| t.as_str()).unwrap_or("") {
        "ping" => {
            let pong = serde_json::json!({ "type": "pong" });
            let _ = ws_tx.send(pong.to_string());
        }
        other => tracing::debug!(msg_type = other, "Ignoring WebSocket message"),
    }
}
