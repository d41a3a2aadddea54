use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub student_id: ObjectId,
    pub teacher_id: ObjectId,
    pub classroom_id: ObjectId,
    pub created_at: DateTime,
}

impl Conversation {
    pub const COLLECTION: &'static str = "conversations";

    pub fn has_participant(&self, user_id: ObjectId) -> bool {
        self.student_id == user_id || self.teacher_id == user_id
    }
}
