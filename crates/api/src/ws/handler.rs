use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bson::{Bson, oid::ObjectId};
use futures::StreamExt;
use serde::Deserialize;
use studyx_db::models::Message as ChatMessage;
use studyx_services::{
    Session,
    realtime::{InboxEvent, InboxUpdate, NotificationListener},
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dispatcher;
use super::storage::WsSender;
use crate::routes::{chat::message_response, notification::to_response};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    // Verify JWT before accepting the WebSocket
    let session = match state
        .auth
        .verify_access_token(&params.token)
        .and_then(|claims| state.auth.session_from_claims(&claims))
    {
        Ok(s) => s,
        Err(_) => return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, session))
}

/// Per-socket state: the notification listener, the task forwarding its
/// updates, and one task per subscribed conversation.
struct Connection {
    session: Session,
    connection_id: String,
    sender: WsSender,
    listener: NotificationListener,
    forwarder: JoinHandle<()>,
    chats: HashMap<ObjectId, JoinHandle<()>>,
}

impl Connection {
    /// Session start: derive due-date notifications, subscribe, then load the
    /// inbox. Anything inserted while loading reaches the client exactly once.
    async fn open(
        state: &AppState,
        session: Session,
        connection_id: String,
        sender: WsSender,
    ) -> (Self, usize) {
        if session.is_student() {
            if let Err(e) = state.notifier.run(&session, state.today()).await {
                warn!(user_id = %session.user_id, %e, "Due-date derivation failed");
            }
        }

        let subscription = NotificationListener::subscribe(state.feed(), session.user_id);
        let initial = state
            .notifications
            .list_for_user(session.user_id, state.settings.notifications.list_limit)
            .await
            .unwrap_or_else(|e| {
                warn!(user_id = %session.user_id, %e, "Failed to load notifications");
                Vec::new()
            });
        let unread = initial.iter().filter(|n| !n.read).count();

        let (listener, mut updates) =
            NotificationListener::start(subscription, session.user_id, initial);

        let forward_to = sender.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                if let Some(event) = inbox_event(&update) {
                    dispatcher::send(&forward_to, &event).await;
                }
            }
        });

        let conn = Self {
            session,
            connection_id,
            sender,
            listener,
            forwarder,
            chats: HashMap::new(),
        };
        (conn, unread)
    }

    async fn handle(&mut self, state: &AppState, text: &str) {
        let parsed: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => return,
        };

        let msg_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
        let data = parsed.get("data");
        let user_id = self.session.user_id;

        debug!(?user_id, connection_id = %self.connection_id, msg_type, "WS message received");

        match msg_type {
            "ping" => {
                let pong = serde_json::json!({ "type": "pong" });
                dispatcher::send(&self.sender, &pong).await;
            }
            "notification:read" => {
                let Some(id) = object_id_field(data, "id") else {
                    return self.error("Missing notification id").await;
                };
                match state.notifications.mark_read(user_id, id).await {
                    Ok(_) => self.listener.dispatch(InboxEvent::MarkedRead(id)),
                    Err(e) => self.error(&e.to_string()).await,
                }
            }
            "chat:subscribe" => {
                let Some(conversation_id) = object_id_field(data, "conversation_id") else {
                    return self.error("Missing conversation id").await;
                };
                if let Err(e) = state
                    .conversations
                    .find_for_participant(conversation_id, user_id)
                    .await
                {
                    return self.error(&e.to_string()).await;
                }
                self.subscribe_chat(state, conversation_id);
                let ack = serde_json::json!({
                    "type": "chat:subscribed",
                    "data": { "conversation_id": conversation_id.to_hex() },
                });
                dispatcher::send(&self.sender, &ack).await;
            }
            "chat:unsubscribe" => {
                if let Some(conversation_id) = object_id_field(data, "conversation_id") {
                    if let Some(task) = self.chats.remove(&conversation_id) {
                        task.abort();
                    }
                }
            }
            _ => {
                debug!(?user_id, msg_type, "Unknown WS message type");
            }
        }
    }

    fn subscribe_chat(&mut self, state: &AppState, conversation_id: ObjectId) {
        if self.chats.contains_key(&conversation_id) {
            return;
        }
        let mut subscription = state.feed().subscribe(
            ChatMessage::COLLECTION,
            Some(("conversation_id".to_string(), Bson::ObjectId(conversation_id))),
        );
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            while let Some(doc) = subscription.next().await {
                match bson::from_document::<ChatMessage>(doc) {
                    Ok(message) => {
                        let event = serde_json::json!({
                            "type": "message:new",
                            "data": message_response(message),
                        });
                        dispatcher::send(&sender, &event).await;
                    }
                    Err(e) => warn!(%conversation_id, %e, "Skipping malformed message"),
                }
            }
        });
        self.chats.insert(conversation_id, task);
    }

    async fn error(&self, message: &str) {
        let event = serde_json::json!({ "type": "error", "data": { "message": message } });
        dispatcher::send(&self.sender, &event).await;
    }

    fn close(self) {
        self.forwarder.abort();
        for (_, task) in self.chats {
            task.abort();
        }
        // Dropping the listener releases its subscription.
        drop(self.listener);
    }
}

fn object_id_field(data: Option<&serde_json::Value>, field: &str) -> Option<ObjectId> {
    data.and_then(|d| d.get(field))
        .and_then(|v| v.as_str())
        .and_then(|s| ObjectId::parse_str(s).ok())
}

fn inbox_event(update: &InboxUpdate) -> Option<serde_json::Value> {
    let unread_count = update.inbox.unread();
    match &update.event {
        InboxEvent::Inserted(notification) => Some(serde_json::json!({
            "type": "notification:new",
            "data": {
                "notification": to_response(notification),
                "unread_count": unread_count,
                "alert": update.alert.as_ref().map(|a| serde_json::json!({
                    "title": a.title,
                    "message": a.message,
                })),
            }
        })),
        InboxEvent::MarkedRead(id) => Some(serde_json::json!({
            "type": "notification:read",
            "data": {
                "id": id.to_hex(),
                "unread_count": unread_count,
            }
        })),
        InboxEvent::Loaded(_) => None,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, session: Session) {
    let connection_id = Uuid::new_v4().to_string();
    let user_id = session.user_id;
    info!(?user_id, %connection_id, "WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sender));

    // Register connection
    state
        .ws_storage
        .add(user_id, connection_id.clone(), sender.clone());

    let role = session.role;
    let (mut conn, unread_count) =
        Connection::open(&state, session, connection_id.clone(), sender.clone()).await;

    // Sent only once the notification subscription is live.
    let connected = serde_json::json!({
        "type": "connected",
        "data": {
            "user_id": user_id.to_hex(),
            "role": role.as_str(),
            "unread_count": unread_count,
        }
    });
    dispatcher::send(&sender, &connected).await;

    // Message loop
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                conn.handle(&state, text.as_str()).await;
            }
            Ok(Message::Ping(data)) => {
                let mut guard = sender.lock().await;
                let _ = futures::SinkExt::send(&mut *guard, Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Err(e) => {
                warn!(?user_id, %connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    conn.close();
    state.ws_storage.remove(&user_id, &connection_id);

    info!(?user_id, %connection_id, "WebSocket disconnected");
}
