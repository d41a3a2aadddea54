use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use studyx_db::models::Classroom;
use studyx_services::dao::classroom::{ClassroomSummary, Membership};
use tracing::info;

use super::{fmt_time, parse_id};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct ClassroomResponse {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
    pub invitation_code: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
}

pub(crate) fn to_response(c: Classroom) -> ClassroomResponse {
    ClassroomResponse {
        id: c.id.map(|id| id.to_hex()).unwrap_or_default(),
        name: c.name,
        teacher_id: c.teacher_id.to_hex(),
        invitation_code: c.invitation_code,
        created_at: fmt_time(c.created_at),
        student_count: None,
        joined_at: None,
    }
}

fn summary_response(s: ClassroomSummary) -> ClassroomResponse {
    ClassroomResponse {
        student_count: Some(s.student_count),
        ..to_response(s.classroom)
    }
}

fn membership_response(m: Membership) -> ClassroomResponse {
    ClassroomResponse {
        joined_at: Some(fmt_time(m.joined_at)),
        ..to_response(m.classroom)
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub student_id: String,
    pub full_name: String,
    pub email: String,
    pub joined_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateClassroomRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub code: String,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ClassroomResponse>>, ApiError> {
    let items = if auth.session().is_teacher() {
        state
            .classrooms
            .list_for_teacher(auth.user_id)
            .await?
            .into_iter()
            .map(summary_response)
            .collect()
    } else {
        state
            .classrooms
            .list_for_student(auth.user_id)
            .await?
            .into_iter()
            .map(membership_response)
            .collect()
    };
    Ok(Json(items))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateClassroomRequest>,
) -> Result<(StatusCode, Json<ClassroomResponse>), ApiError> {
    auth.require_teacher()?;
    let classroom = state.classrooms.create(auth.user_id, &body.name).await?;
    info!(teacher_id = %auth.user_id, code = %classroom.invitation_code, "Classroom created");
    Ok((StatusCode::CREATED, Json(to_response(classroom))))
}

pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<JoinRequest>,
) -> Result<Json<ClassroomResponse>, ApiError> {
    auth.require_student()?;
    let classroom = state.classrooms.redeem(auth.user_id, &body.code).await?;
    Ok(Json(to_response(classroom)))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(classroom_id): Path<String>,
) -> Result<Json<ClassroomResponse>, ApiError> {
    let cid = parse_id(&classroom_id, "classroom_id")?;
    let classroom = state
        .classrooms
        .find_accessible(&auth.session(), cid)
        .await?;
    Ok(Json(to_response(classroom)))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(classroom_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cid = parse_id(&classroom_id, "classroom_id")?;
    state.classrooms.find_owned(auth.user_id, cid).await?;
    state.classrooms.delete_cascade(cid).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(classroom_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.require_student()?;
    let cid = parse_id(&classroom_id, "classroom_id")?;
    state.classrooms.leave(cid, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "left": true })))
}

pub async fn members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(classroom_id): Path<String>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let cid = parse_id(&classroom_id, "classroom_id")?;
    state.classrooms.find_owned(auth.user_id, cid).await?;

    let rows = state.classrooms.members_of(cid).await?;
    let ids: Vec<_> = rows.iter().map(|m| m.student_id).collect();
    let users = state.users.find_by_ids(&ids).await?;

    let members = rows
        .into_iter()
        .filter_map(|m| {
            let user = users.iter().find(|u| u.id == Some(m.student_id))?;
            Some(MemberResponse {
                student_id: m.student_id.to_hex(),
                full_name: user.full_name.clone(),
                email: user.email.clone(),
                joined_at: fmt_time(m.joined_at),
            })
        })
        .collect();
    Ok(Json(members))
}
