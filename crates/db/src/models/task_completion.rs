use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// One row per (task, student).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletion {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub task_id: ObjectId,
    pub student_id: ObjectId,
    #[serde(default)]
    pub completed: bool,
    pub completed_at: Option<DateTime>,
    pub updated_at: DateTime,
}

impl TaskCompletion {
    pub const COLLECTION: &'static str = "task_completions";
}
