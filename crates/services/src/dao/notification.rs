use bson::{doc, oid::ObjectId};
use studyx_db::models::Notification;
use studyx_db::store::FindOptions;

use super::base::{Backend, BaseDao, DaoError, DaoResult};

pub struct NotificationDao {
    pub base: BaseDao<Notification>,
}

impl NotificationDao {
    pub fn new(backend: &Backend) -> Self {
        Self {
            base: BaseDao::new(backend, Notification::COLLECTION),
        }
    }

    /// Newest first, at most `limit` entries.
    pub async fn list_for_user(&self, user_id: ObjectId, limit: i64) -> DaoResult<Vec<Notification>> {
        self.base
            .find_with(
                doc! { "user_id": user_id },
                FindOptions::sorted(doc! { "created_at": -1 }).limit(limit),
            )
            .await
    }

    pub async fn unread_count(&self, user_id: ObjectId) -> DaoResult<u64> {
        self.base
            .count(doc! { "user_id": user_id, "read": false })
            .await
    }

    /// An existing due-date notification for this user and task, if any.
    pub async fn find_for_task(
        &self,
        user_id: ObjectId,
        task_id: ObjectId,
    ) -> DaoResult<Option<Notification>> {
        self.base
            .find_one(doc! {
                "user_id": user_id,
                "task_id": task_id,
                "type": { "$in": ["due_soon", "overdue"] },
            })
            .await
    }

    pub async fn create(&self, notification: &Notification) -> DaoResult<Notification> {
        self.base.create(notification).await
    }

    /// Marks one of the user's notifications read. Returns whether it was
    /// unread before.
    pub async fn mark_read(&self, user_id: ObjectId, id: ObjectId) -> DaoResult<bool> {
        let existing = self
            .base
            .find_one(doc! { "_id": id, "user_id": user_id })
            .await?
            .ok_or(DaoError::NotFound)?;
        if existing.read {
            return Ok(false);
        }
        self.base
            .update_one(
                doc! { "_id": id, "user_id": user_id },
                doc! { "$set": { "read": true } },
            )
            .await
    }
}
