use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct InviteInfo {
    pub classroom_id: String,
    pub name: String,
    pub teacher_name: String,
    pub student_count: u64,
}

/// Looks a classroom up by invitation code without requiring membership.
pub async fn get_invite_info(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(code): Path<String>,
) -> Result<Json<InviteInfo>, ApiError> {
    let classroom = state
        .classrooms
        .find_by_invitation_code(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid invitation code".to_string()))?;
    let classroom_id = classroom
        .id
        .ok_or_else(|| ApiError::Internal("Classroom without id".to_string()))?;

    let teacher_name = state
        .users
        .base
        .find_one(bson::doc! { "_id": classroom.teacher_id })
        .await?
        .map(|u| u.full_name)
        .unwrap_or_else(|| "Unknown Teacher".to_string());
    let student_count = state
        .classrooms
        .members
        .count(bson::doc! { "classroom_id": classroom_id })
        .await?;

    Ok(Json(InviteInfo {
        classroom_id: classroom_id.to_hex(),
        name: classroom.name,
        teacher_name,
        student_count,
    }))
}
