use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
};
use bson::oid::ObjectId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use studyx_db::models::{DocumentRef, Priority, Task};
use studyx_services::dao::task::{NewTask, TaskQuery};
use studyx_services::storage::{ASSIGNMENTS_BUCKET, object_path};
use studyx_services::Session;

use super::{MultipartForm, file_response, fmt_time, parse_id};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub name: String,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub classroom_id: String,
    pub created_by: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: String,
    pub document: Option<DocumentResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    pub created_at: String,
}

pub(crate) fn to_response(t: Task, completed: Option<bool>) -> TaskResponse {
    TaskResponse {
        id: t.id.map(|id| id.to_hex()).unwrap_or_default(),
        classroom_id: t.classroom_id.to_hex(),
        created_by: t.created_by.to_hex(),
        title: t.title,
        description: t.description,
        priority: t.priority,
        due_date: t.due_date.to_string(),
        document: t.document.map(|d| DocumentResponse {
            name: d.name,
            content_type: d.content_type,
        }),
        completed,
        created_at: fmt_time(t.created_at),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub task_id: String,
    pub completed: bool,
    pub completed_at: Option<String>,
}

/// Tasks the caller can see, with the student's own completion flags.
pub(crate) async fn visible_tasks(
    state: &AppState,
    session: &Session,
    query: &TaskQuery,
) -> Result<Vec<TaskResponse>, ApiError> {
    let classroom_ids = state.classrooms.visible_classroom_ids(session).await?;
    let tasks = state.tasks.list_for_classrooms(&classroom_ids, query).await?;

    if !session.is_student() {
        return Ok(tasks.into_iter().map(|t| to_response(t, None)).collect());
    }

    let task_ids: Vec<ObjectId> = tasks.iter().filter_map(|t| t.id).collect();
    let done: HashMap<ObjectId, bool> = state
        .tasks
        .completions_for_student(session.user_id, &task_ids)
        .await?
        .into_iter()
        .map(|c| (c.task_id, c.completed))
        .collect();

    Ok(tasks
        .into_iter()
        .map(|t| {
            let completed = t.id.and_then(|id| done.get(&id).copied()).unwrap_or(false);
            to_response(t, Some(completed))
        })
        .collect())
}

/// The task if the caller owns or belongs to its classroom.
pub(crate) async fn accessible_task(
    state: &AppState,
    session: &Session,
    task_id: ObjectId,
) -> Result<Task, ApiError> {
    let task = state.tasks.base.find_by_id(task_id).await?;
    state
        .classrooms
        .find_accessible(session, task.classroom_id)
        .await?;
    Ok(task)
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let query = TaskQuery {
        search: params.q,
        due_date: params.due,
        ..Default::default()
    };
    Ok(Json(visible_tasks(&state, &auth.session(), &query).await?))
}

/// Multipart fields: `classroom_id`, `title`, `description`, `priority`,
/// `due_date` (YYYY-MM-DD) and an optional `document` file.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    auth.require_teacher()?;
    let form = MultipartForm::read(multipart, "document").await?;

    let classroom_id = parse_id(form.required("classroom_id")?, "classroom_id")?;
    state
        .classrooms
        .find_owned(auth.user_id, classroom_id)
        .await?;

    let title = form.required("title")?.to_string();
    let due_date: NaiveDate = form
        .required("due_date")?
        .parse()
        .map_err(|_| ApiError::Validation("due_date must be YYYY-MM-DD".to_string()))?;
    let priority = match form.text("priority") {
        Some(p) => p.parse::<Priority>().map_err(ApiError::Validation)?,
        None => Priority::default(),
    };
    let description = form.text("description").map(str::to_string);

    // The upload must succeed before the task exists.
    let document = match form.file {
        Some(file) => {
            let path = object_path(&auth.user_id.to_hex(), &file.file_name);
            state
                .storage
                .upload(ASSIGNMENTS_BUCKET, &path, file.bytes, &file.content_type)
                .await?;
            Some(DocumentRef {
                bucket: ASSIGNMENTS_BUCKET.to_string(),
                path,
                name: file.file_name,
                content_type: file.content_type,
            })
        }
        None => None,
    };

    let task = state
        .tasks
        .create(
            auth.user_id,
            NewTask {
                classroom_id,
                title,
                description,
                priority,
                due_date,
                document,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(task, None))))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let tid = parse_id(&task_id, "task_id")?;
    let session = auth.session();
    let task = accessible_task(&state, &session, tid).await?;

    let completed = if session.is_student() {
        Some(
            state
                .tasks
                .completion_for(tid, auth.user_id)
                .await?
                .is_some_and(|c| c.completed),
        )
    } else {
        None
    };
    Ok(Json(to_response(task, completed)))
}

pub async fn download_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Response, ApiError> {
    let tid = parse_id(&task_id, "task_id")?;
    let task = accessible_task(&state, &auth.session(), tid).await?;
    let document = task
        .document
        .ok_or_else(|| ApiError::NotFound("Task has no document".to_string()))?;

    let object = state.storage.download(&document.bucket, &document.path).await?;
    file_response(object, &document.name, false)
}

pub async fn toggle_completion(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<CompletionResponse>, ApiError> {
    auth.require_student()?;
    let tid = parse_id(&task_id, "task_id")?;
    accessible_task(&state, &auth.session(), tid).await?;

    let completion = state.tasks.toggle_completion(tid, auth.user_id).await?;
    Ok(Json(CompletionResponse {
        task_id: tid.to_hex(),
        completed: completion.completed,
        completed_at: completion.completed_at.map(fmt_time),
    }))
}
