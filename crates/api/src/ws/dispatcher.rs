use axum::extract::ws::Message;
use futures::SinkExt;
use tracing::warn;

use super::storage::WsSender;

/// Sends a JSON message over one connection.
pub async fn send(sender: &WsSender, message: &serde_json::Value) -> bool {
    let text = serde_json::to_string(message).unwrap_or_default();
    let mut guard = sender.lock().await;
    match guard.send(Message::text(text)).await {
        Ok(()) => true,
        Err(e) => {
            warn!(%e, "Failed to send WS message");
            false
        }
    }
}
