use bson::{Bson, DateTime, doc, oid::ObjectId};
use chrono::NaiveDate;
use studyx_db::models::{DocumentRef, Priority, Task, TaskCompletion, TaskSubmission};
use studyx_db::store::FindOptions;
use tracing::info;

use super::base::{Backend, BaseDao, DaoError, DaoResult};

pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct NewTask {
    pub classroom_id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub document: Option<DocumentRef>,
}

/// Narrowing applied to a task listing.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Inclusive bounds on the due date.
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl TaskQuery {
    fn matches(&self, task: &Task) -> bool {
        if self.due_from.is_some_and(|from| task.due_date < from)
            || self.due_to.is_some_and(|to| task.due_date > to)
        {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

pub struct TaskDao {
    pub base: BaseDao<Task>,
    pub completions: BaseDao<TaskCompletion>,
    pub submissions: BaseDao<TaskSubmission>,
}

impl TaskDao {
    pub fn new(backend: &Backend) -> Self {
        Self {
            base: BaseDao::new(backend, Task::COLLECTION),
            completions: BaseDao::new(backend, TaskCompletion::COLLECTION),
            submissions: BaseDao::new(backend, TaskSubmission::COLLECTION),
        }
    }

    pub async fn create(&self, created_by: ObjectId, new: NewTask) -> DaoResult<Task> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(DaoError::Validation("Title is required".to_string()));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(DaoError::Validation(format!(
                "Title must be at most {} characters",
                TITLE_MAX_CHARS
            )));
        }

        let task = Task {
            id: None,
            classroom_id: new.classroom_id,
            created_by,
            title,
            description: new
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            priority: new.priority,
            due_date: new.due_date,
            document: new.document,
            created_at: DateTime::now(),
        };

        let task = self.base.create(&task).await?;
        info!(task_id = ?task.id, classroom_id = %task.classroom_id, "Task created");
        Ok(task)
    }

    /// Tasks of the given classrooms, earliest due date first.
    pub async fn list_for_classrooms(
        &self,
        classroom_ids: &[ObjectId],
        query: &TaskQuery,
    ) -> DaoResult<Vec<Task>> {
        if classroom_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut filter = doc! { "classroom_id": { "$in": classroom_ids.to_vec() } };
        if let Some(due) = query.due_date {
            filter.insert("due_date", due.to_string());
        }

        let tasks = self
            .base
            .find_with(
                filter,
                FindOptions::sorted(doc! { "due_date": 1, "created_at": 1 }),
            )
            .await?;
        Ok(tasks.into_iter().filter(|t| query.matches(t)).collect())
    }

    pub async fn completion_for(
        &self,
        task_id: ObjectId,
        student_id: ObjectId,
    ) -> DaoResult<Option<TaskCompletion>> {
        self.completions
            .find_one(doc! { "task_id": task_id, "student_id": student_id })
            .await
    }

    pub async fn completions_for_student(
        &self,
        student_id: ObjectId,
        task_ids: &[ObjectId],
    ) -> DaoResult<Vec<TaskCompletion>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.completions
            .find_many(
                doc! { "student_id": student_id, "task_id": { "$in": task_ids.to_vec() } },
                None,
            )
            .await
    }

    /// Flips the student's completion flag, creating the row on first use.
    /// `completed_at` is set exactly when the task becomes completed.
    pub async fn toggle_completion(
        &self,
        task_id: ObjectId,
        student_id: ObjectId,
    ) -> DaoResult<TaskCompletion> {
        let current = self
            .completion_for(task_id, student_id)
            .await?
            .map(|c| c.completed)
            .unwrap_or(false);
        let completed = !current;
        let now = DateTime::now();
        let completed_at = if completed { Bson::DateTime(now) } else { Bson::Null };

        let key = doc! { "task_id": task_id, "student_id": student_id };
        self.completions
            .upsert(
                key.clone(),
                doc! {
                    "$set": {
                        "completed": completed,
                        "completed_at": completed_at,
                        "updated_at": now,
                    }
                },
            )
            .await?;

        self.completions
            .find_one(key)
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Records (or replaces) the student's submission.
    pub async fn submit(
        &self,
        task_id: ObjectId,
        student_id: ObjectId,
        document: DocumentRef,
    ) -> DaoResult<TaskSubmission> {
        let key = doc! { "task_id": task_id, "student_id": student_id };
        self.submissions
            .upsert(
                key.clone(),
                doc! {
                    "$set": {
                        "document": bson::to_bson(&document)?,
                        "submitted_at": DateTime::now(),
                    }
                },
            )
            .await?;
        info!(%task_id, %student_id, "Submission stored");

        self.submissions
            .find_one(key)
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn submissions_for_task(&self, task_id: ObjectId) -> DaoResult<Vec<TaskSubmission>> {
        self.submissions
            .find_many(doc! { "task_id": task_id }, Some(doc! { "submitted_at": -1 }))
            .await
    }

    pub async fn submission_for(
        &self,
        task_id: ObjectId,
        student_id: ObjectId,
    ) -> DaoResult<Option<TaskSubmission>> {
        self.submissions
            .find_one(doc! { "task_id": task_id, "student_id": student_id })
            .await
    }
}

/// Submissions close at the end of the due date.
pub fn submission_open(task: &Task, today: NaiveDate) -> bool {
    today <= task.due_date
}
