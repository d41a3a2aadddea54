use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use studyx_db::models::{Attachment, Conversation, Message, User};
use studyx_services::storage::{CHAT_FILES_BUCKET, object_path};

use super::{MultipartForm, fmt_time, parse_id};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

const UNKNOWN_TEACHER: &str = "Unknown Teacher";

#[derive(Debug, Serialize)]
pub struct TeacherEntry {
    pub teacher_id: String,
    pub teacher_name: String,
    pub classroom_id: String,
    pub classroom_name: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub classroom_id: String,
    pub student_name: Option<String>,
    pub teacher_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    pub url: String,
    pub name: String,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: Option<String>,
    pub attachment: Option<AttachmentResponse>,
    pub created_at: String,
}

pub(crate) fn message_response(m: Message) -> MessageResponse {
    MessageResponse {
        id: m.id.map(|id| id.to_hex()).unwrap_or_default(),
        conversation_id: m.conversation_id.to_hex(),
        sender_id: m.sender_id.to_hex(),
        content: m.content,
        attachment: m.attachment.map(|a| AttachmentResponse {
            url: a.url,
            name: a.name,
            content_type: a.content_type,
        }),
        created_at: fmt_time(m.created_at),
    }
}

fn name_of(users: &[User], id: ObjectId) -> Option<String> {
    users
        .iter()
        .find(|u| u.id == Some(id))
        .map(|u| u.full_name.clone())
}

fn conversation_response(c: Conversation, users: &[User]) -> ConversationResponse {
    ConversationResponse {
        id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
        student_id: c.student_id.to_hex(),
        teacher_id: c.teacher_id.to_hex(),
        classroom_id: c.classroom_id.to_hex(),
        student_name: name_of(users, c.student_id),
        teacher_name: name_of(users, c.teacher_id),
        created_at: fmt_time(c.created_at),
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenConversationRequest {
    pub teacher_id: String,
    pub classroom_id: String,
}

/// One entry per classroom the student belongs to.
pub async fn teachers(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<TeacherEntry>>, ApiError> {
    auth.require_student()?;
    let memberships = state.classrooms.list_for_student(auth.user_id).await?;
    let teacher_ids: Vec<_> = memberships.iter().map(|m| m.classroom.teacher_id).collect();
    let users = state.users.find_by_ids(&teacher_ids).await?;

    Ok(Json(
        memberships
            .into_iter()
            .map(|m| TeacherEntry {
                teacher_id: m.classroom.teacher_id.to_hex(),
                teacher_name: name_of(&users, m.classroom.teacher_id)
                    .unwrap_or_else(|| UNKNOWN_TEACHER.to_string()),
                classroom_id: m.classroom.id.map(|id| id.to_hex()).unwrap_or_default(),
                classroom_name: m.classroom.name,
            })
            .collect(),
    ))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ConversationResponse>>, ApiError> {
    let conversations = state.conversations.list_for_user(auth.user_id).await?;
    let mut ids: Vec<ObjectId> = conversations
        .iter()
        .flat_map(|c| [c.student_id, c.teacher_id])
        .collect();
    ids.sort();
    ids.dedup();
    let users = state.users.find_by_ids(&ids).await?;

    Ok(Json(
        conversations
            .into_iter()
            .map(|c| conversation_response(c, &users))
            .collect(),
    ))
}

/// Opens (or returns) the student's conversation with a classroom's teacher.
pub async fn open_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<OpenConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), ApiError> {
    auth.require_student()?;
    let teacher_id = parse_id(&body.teacher_id, "teacher_id")?;
    let classroom_id = parse_id(&body.classroom_id, "classroom_id")?;

    let classroom = state
        .classrooms
        .find_accessible(&auth.session(), classroom_id)
        .await?;
    if classroom.teacher_id != teacher_id {
        return Err(ApiError::BadRequest(
            "Teacher does not own this classroom".to_string(),
        ));
    }

    let conversation = state
        .conversations
        .get_or_create(auth.user_id, teacher_id, classroom_id)
        .await?;
    let users = state.users.find_by_ids(&[auth.user_id, teacher_id]).await?;
    Ok((StatusCode::OK, Json(conversation_response(conversation, &users))))
}

pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let cid = parse_id(&conversation_id, "conversation_id")?;
    state
        .conversations
        .find_for_participant(cid, auth.user_id)
        .await?;
    let messages = state.conversations.list_messages(cid).await?;
    Ok(Json(messages.into_iter().map(message_response).collect()))
}

/// Multipart fields: `content` and an optional `file`, stored in the
/// public chat bucket.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let cid = parse_id(&conversation_id, "conversation_id")?;
    state
        .conversations
        .find_for_participant(cid, auth.user_id)
        .await?;

    let form = MultipartForm::read(multipart, "file").await?;
    let content = form.text("content").map(str::to_string);

    let attachment = match form.file {
        Some(file) => {
            let path = object_path(&auth.user_id.to_hex(), &file.file_name);
            state
                .storage
                .upload(CHAT_FILES_BUCKET, &path, file.bytes, &file.content_type)
                .await?;
            let url = state
                .storage
                .public_url(CHAT_FILES_BUCKET, &path)
                .ok_or_else(|| ApiError::Internal("Chat bucket is not public".to_string()))?;
            Some(Attachment {
                url,
                name: file.file_name,
                content_type: file.content_type,
            })
        }
        None => None,
    };

    let message = state
        .conversations
        .send_message(cid, auth.user_id, content, attachment)
        .await?;
    Ok((StatusCode::CREATED, Json(message_response(message))))
}
