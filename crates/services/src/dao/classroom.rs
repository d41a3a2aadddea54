use bson::{DateTime, doc, oid::ObjectId};
use studyx_db::models::{
    Classroom, ClassroomMember, Conversation, Message, Notification, Task, TaskCompletion,
    TaskSubmission,
};
use tracing::{debug, info};

use super::base::{Backend, BaseDao, DaoError, DaoResult};
use crate::invitation::{InvitationCodeIssuer, normalize_code};
use crate::session::Session;

const MAX_INSERT_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct ClassroomSummary {
    pub classroom: Classroom,
    pub student_count: u64,
}

#[derive(Debug, Clone)]
pub struct Membership {
    pub classroom: Classroom,
    pub joined_at: DateTime,
}

pub struct ClassroomDao {
    pub base: BaseDao<Classroom>,
    pub members: BaseDao<ClassroomMember>,
    issuer: InvitationCodeIssuer,
    backend: Backend,
}

pub fn validate_classroom_name(name: &str) -> DaoResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if !(3..=100).contains(&len) {
        return Err(DaoError::Validation(
            "Classroom name must be between 3 and 100 characters".to_string(),
        ));
    }
    Ok(name.to_string())
}

impl ClassroomDao {
    pub fn new(backend: &Backend) -> Self {
        Self::with_issuer(backend, InvitationCodeIssuer::new(backend))
    }

    pub fn with_issuer(backend: &Backend, issuer: InvitationCodeIssuer) -> Self {
        Self {
            base: BaseDao::new(backend, Classroom::COLLECTION),
            members: BaseDao::new(backend, ClassroomMember::COLLECTION),
            issuer,
            backend: backend.clone(),
        }
    }

    /// Creates a classroom owned by `teacher_id` with a freshly issued code.
    /// A code taken between issue and insert is replaced and the insert
    /// retried.
    pub async fn create(&self, teacher_id: ObjectId, name: &str) -> DaoResult<Classroom> {
        let name = validate_classroom_name(name)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = DateTime::now();
            let classroom = Classroom {
                id: None,
                teacher_id,
                name: name.clone(),
                invitation_code: self.issuer.issue().await?,
                created_at: now,
                updated_at: now,
            };
            match self.base.create(&classroom).await {
                Err(DaoError::DuplicateKey(msg)) if attempt < MAX_INSERT_ATTEMPTS => {
                    debug!(attempt, %msg, "Invitation code raced, re-issuing");
                }
                other => return other,
            }
        }
    }

    pub async fn find_by_invitation_code(&self, code: &str) -> DaoResult<Option<Classroom>> {
        self.base
            .find_one(doc! { "invitation_code": normalize_code(code) })
            .await
    }

    /// Joins `student_id` to the classroom holding `code`.
    pub async fn redeem(&self, student_id: ObjectId, code: &str) -> DaoResult<Classroom> {
        let classroom = self
            .find_by_invitation_code(code)
            .await?
            .ok_or_else(|| DaoError::Validation("Invalid invitation code".to_string()))?;
        let classroom_id = classroom.id.ok_or(DaoError::NotFound)?;

        if self.is_member(classroom_id, student_id).await? {
            return Err(already_member());
        }

        let member = ClassroomMember {
            id: None,
            classroom_id,
            student_id,
            joined_at: DateTime::now(),
        };
        match self.members.insert_one(&member).await {
            Ok(_) => {
                info!(%classroom_id, %student_id, "Student joined classroom");
                Ok(classroom)
            }
            Err(DaoError::DuplicateKey(_)) => Err(already_member()),
            Err(e) => Err(e),
        }
    }

    pub async fn is_member(&self, classroom_id: ObjectId, student_id: ObjectId) -> DaoResult<bool> {
        Ok(self
            .members
            .count(doc! { "classroom_id": classroom_id, "student_id": student_id })
            .await?
            > 0)
    }

    pub async fn member_classroom_ids(&self, student_id: ObjectId) -> DaoResult<Vec<ObjectId>> {
        let rows = self
            .members
            .find_many(doc! { "student_id": student_id }, None)
            .await?;
        Ok(rows.into_iter().map(|m| m.classroom_id).collect())
    }

    pub async fn owned_classroom_ids(&self, teacher_id: ObjectId) -> DaoResult<Vec<ObjectId>> {
        let rows = self
            .base
            .find_many(doc! { "teacher_id": teacher_id }, None)
            .await?;
        Ok(rows.into_iter().filter_map(|c| c.id).collect())
    }

    /// Classrooms the caller can see: owned ones for teachers, joined ones
    /// for students.
    pub async fn visible_classroom_ids(&self, session: &Session) -> DaoResult<Vec<ObjectId>> {
        if session.is_teacher() {
            self.owned_classroom_ids(session.user_id).await
        } else {
            self.member_classroom_ids(session.user_id).await
        }
    }

    pub async fn list_for_teacher(&self, teacher_id: ObjectId) -> DaoResult<Vec<ClassroomSummary>> {
        let classrooms = self
            .base
            .find_many(doc! { "teacher_id": teacher_id }, Some(doc! { "created_at": -1 }))
            .await?;

        let mut summaries = Vec::with_capacity(classrooms.len());
        for classroom in classrooms {
            let student_count = match classroom.id {
                Some(id) => self.members.count(doc! { "classroom_id": id }).await?,
                None => 0,
            };
            summaries.push(ClassroomSummary {
                classroom,
                student_count,
            });
        }
        Ok(summaries)
    }

    pub async fn list_for_student(&self, student_id: ObjectId) -> DaoResult<Vec<Membership>> {
        let rows = self
            .members
            .find_many(doc! { "student_id": student_id }, Some(doc! { "joined_at": -1 }))
            .await?;

        let mut memberships = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(classroom) = self.base.find_one(doc! { "_id": row.classroom_id }).await? {
                memberships.push(Membership {
                    classroom,
                    joined_at: row.joined_at,
                });
            }
        }
        Ok(memberships)
    }

    /// The classroom if the caller owns it or is a member of it.
    pub async fn find_accessible(&self, session: &Session, classroom_id: ObjectId) -> DaoResult<Classroom> {
        let classroom = self.base.find_by_id(classroom_id).await?;
        if classroom.teacher_id == session.user_id
            || self.is_member(classroom_id, session.user_id).await?
        {
            return Ok(classroom);
        }
        Err(DaoError::Forbidden("Not a member of this classroom".to_string()))
    }

    pub async fn find_owned(&self, teacher_id: ObjectId, classroom_id: ObjectId) -> DaoResult<Classroom> {
        let classroom = self.base.find_by_id(classroom_id).await?;
        if classroom.teacher_id != teacher_id {
            return Err(DaoError::Forbidden(
                "Only the classroom's teacher can do this".to_string(),
            ));
        }
        Ok(classroom)
    }

    pub async fn members_of(&self, classroom_id: ObjectId) -> DaoResult<Vec<ClassroomMember>> {
        self.members
            .find_many(doc! { "classroom_id": classroom_id }, Some(doc! { "joined_at": 1 }))
            .await
    }

    pub async fn leave(&self, classroom_id: ObjectId, student_id: ObjectId) -> DaoResult<()> {
        let removed = self
            .members
            .hard_delete(doc! { "classroom_id": classroom_id, "student_id": student_id })
            .await?;
        if removed == 0 {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }

    /// Deletes the classroom together with everything that hangs off it.
    pub async fn delete_cascade(&self, classroom_id: ObjectId) -> DaoResult<()> {
        let store = &self.backend.store;

        let task_ids: Vec<ObjectId> = store
            .find(Task::COLLECTION, doc! { "classroom_id": classroom_id }, Default::default())
            .await?
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect();
        let conversation_ids: Vec<ObjectId> = store
            .find(
                Conversation::COLLECTION,
                doc! { "classroom_id": classroom_id },
                Default::default(),
            )
            .await?
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect();

        let by_task = doc! { "task_id": { "$in": task_ids.clone() } };
        store.delete_many(TaskCompletion::COLLECTION, by_task.clone()).await?;
        store.delete_many(TaskSubmission::COLLECTION, by_task.clone()).await?;
        store.delete_many(Notification::COLLECTION, by_task).await?;
        store
            .delete_many(Task::COLLECTION, doc! { "classroom_id": classroom_id })
            .await?;
        store
            .delete_many(
                Message::COLLECTION,
                doc! { "conversation_id": { "$in": conversation_ids } },
            )
            .await?;
        store
            .delete_many(Conversation::COLLECTION, doc! { "classroom_id": classroom_id })
            .await?;
        store
            .delete_many(ClassroomMember::COLLECTION, doc! { "classroom_id": classroom_id })
            .await?;
        self.base.hard_delete(doc! { "_id": classroom_id }).await?;

        info!(%classroom_id, tasks = task_ids.len(), "Classroom deleted");
        Ok(())
    }
}

fn already_member() -> DaoError {
    DaoError::DuplicateKey("You are already a member of this classroom".to_string())
}
