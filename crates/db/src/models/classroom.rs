use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub teacher_id: ObjectId,
    pub name: String,
    /// Fixed at creation; never rewritten.
    pub invitation_code: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Classroom {
    pub const COLLECTION: &'static str = "classrooms";
    pub const CODE_LEN: usize = 8;
}
