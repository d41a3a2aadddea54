use axum::{
    Json,
    extract::{Path, State},
};
use bson::oid::ObjectId;
use serde::Serialize;
use studyx_db::models::{Notification, NotificationType};

use super::{fmt_time, parse_id};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub task_id: Option<String>,
    pub read: bool,
    pub created_at: String,
}

pub(crate) fn to_response(n: &Notification) -> NotificationResponse {
    NotificationResponse {
        id: n.id.map(|id| id.to_hex()).unwrap_or_default(),
        notification_type: n.notification_type,
        title: n.title.clone(),
        message: n.message.clone(),
        task_id: n.task_id.map(|id| id.to_hex()),
        read: n.read,
        created_at: fmt_time(n.created_at),
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub items: Vec<NotificationResponse>,
    pub unread_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CheckDueResponse {
    pub created: usize,
    pub failures: usize,
    #[serde(flatten)]
    pub list: NotificationList,
}

async fn load(state: &AppState, user_id: ObjectId) -> Result<NotificationList, ApiError> {
    let items = state
        .notifications
        .list_for_user(user_id, state.settings.notifications.list_limit)
        .await?;
    let unread_count = state.notifications.unread_count(user_id).await?;
    Ok(NotificationList {
        items: items.iter().map(to_response).collect(),
        unread_count,
    })
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<NotificationList>, ApiError> {
    Ok(Json(load(&state, auth.user_id).await?))
}

/// Derives due-date notifications for the caller, then returns the
/// refreshed list.
pub async fn check_due(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CheckDueResponse>, ApiError> {
    let report = state.notifier.run(&auth.session(), state.today()).await?;
    Ok(Json(CheckDueResponse {
        created: report.created(),
        failures: report.failures.len(),
        list: load(&state, auth.user_id).await?,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let nid = parse_id(&notification_id, "notification_id")?;
    state.notifications.mark_read(auth.user_id, nid).await?;
    let unread_count = state.notifications.unread_count(auth.user_id).await?;
    Ok(Json(serde_json::json!({
        "id": nid.to_hex(),
        "read": true,
        "unread_count": unread_count,
    })))
}
