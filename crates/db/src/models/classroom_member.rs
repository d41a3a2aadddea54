use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomMember {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub classroom_id: ObjectId,
    pub student_id: ObjectId,
    pub joined_at: DateTime,
}

impl ClassroomMember {
    pub const COLLECTION: &'static str = "classroom_members";
}
