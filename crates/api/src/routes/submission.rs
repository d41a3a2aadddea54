use axum::{
    Json,
    extract::{Multipart, Path, State},
    response::Response,
};
use serde::Serialize;
use studyx_db::models::{DocumentRef, TaskSubmission};
use studyx_services::dao::task::submission_open;
use studyx_services::storage::{SUBMISSIONS_BUCKET, object_path};

use super::task::accessible_task;
use super::{MultipartForm, file_response, fmt_time, parse_id};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: String,
    pub task_id: String,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub submitted_at: String,
}

fn to_response(s: TaskSubmission, student_name: Option<String>) -> SubmissionResponse {
    SubmissionResponse {
        id: s.id.map(|id| id.to_hex()).unwrap_or_default(),
        task_id: s.task_id.to_hex(),
        student_id: s.student_id.to_hex(),
        student_name,
        file_name: s.document.name,
        content_type: s.document.content_type,
        submitted_at: fmt_time(s.submitted_at),
    }
}

/// Multipart field `file`. Replaces any earlier submission.
pub async fn submit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<SubmissionResponse>, ApiError> {
    auth.require_student()?;
    let tid = parse_id(&task_id, "task_id")?;
    let task = accessible_task(&state, &auth.session(), tid).await?;

    if !submission_open(&task, state.today()) {
        return Err(ApiError::Validation(
            "The due date for this task has passed".to_string(),
        ));
    }

    let form = MultipartForm::read(multipart, "file").await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let prefix = format!("{}/{}", auth.user_id.to_hex(), tid.to_hex());
    let path = object_path(&prefix, &file.file_name);
    state
        .storage
        .upload(SUBMISSIONS_BUCKET, &path, file.bytes, &file.content_type)
        .await?;

    let submission = state
        .tasks
        .submit(
            tid,
            auth.user_id,
            DocumentRef {
                bucket: SUBMISSIONS_BUCKET.to_string(),
                path,
                name: file.file_name,
                content_type: file.content_type,
            },
        )
        .await?;
    Ok(Json(to_response(submission, None)))
}

/// Teachers see every submission for their task; students see their own.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<Vec<SubmissionResponse>>, ApiError> {
    let tid = parse_id(&task_id, "task_id")?;
    let session = auth.session();
    let task = accessible_task(&state, &session, tid).await?;

    if session.is_student() {
        let own = state.tasks.submission_for(tid, auth.user_id).await?;
        return Ok(Json(own.into_iter().map(|s| to_response(s, None)).collect()));
    }

    state.classrooms.find_owned(auth.user_id, task.classroom_id).await?;
    let submissions = state.tasks.submissions_for_task(tid).await?;
    let ids: Vec<_> = submissions.iter().map(|s| s.student_id).collect();
    let users = state.users.find_by_ids(&ids).await?;

    Ok(Json(
        submissions
            .into_iter()
            .map(|s| {
                let name = users
                    .iter()
                    .find(|u| u.id == Some(s.student_id))
                    .map(|u| u.full_name.clone());
                to_response(s, name)
            })
            .collect(),
    ))
}

pub async fn download(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((task_id, submission_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let tid = parse_id(&task_id, "task_id")?;
    let sid = parse_id(&submission_id, "submission_id")?;
    let task = accessible_task(&state, &auth.session(), tid).await?;

    let submission = state.tasks.submissions.find_by_id(sid).await?;
    if submission.task_id != tid {
        return Err(ApiError::NotFound("Resource not found".to_string()));
    }
    if submission.student_id != auth.user_id {
        state.classrooms.find_owned(auth.user_id, task.classroom_id).await?;
    }

    let document = submission.document;
    let object = state.storage.download(&document.bucket, &document.path).await?;
    file_response(object, &document.name, false)
}
