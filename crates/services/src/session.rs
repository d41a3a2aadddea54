use bson::oid::ObjectId;
use studyx_db::models::Role;

/// The authenticated caller, passed explicitly to every operation that
/// depends on who is asking.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: ObjectId,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: ObjectId, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
        }
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}
