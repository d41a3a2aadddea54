use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::task::DocumentRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSubmission {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub task_id: ObjectId,
    pub student_id: ObjectId,
    pub document: DocumentRef,
    pub submitted_at: DateTime,
}

impl TaskSubmission {
    pub const COLLECTION: &'static str = "task_submissions";
}
