use bson::{DateTime, doc, oid::ObjectId};
use studyx_db::models::{Role, User};

use super::base::{Backend, BaseDao, DaoError, DaoResult};

/// Profile fields collected at sign-up.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub mobile_number: Option<String>,
    pub age: Option<u32>,
    pub role: Role,
}

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(backend: &Backend) -> Self {
        Self {
            base: BaseDao::new(backend, User::COLLECTION),
        }
    }

    pub async fn create(&self, profile: NewUser, password_hash: String) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            email: profile.email.trim().to_lowercase(),
            full_name: profile.full_name.trim().to_string(),
            mobile_number: profile.mobile_number.filter(|m| !m.trim().is_empty()),
            age: profile.age,
            role: profile.role,
            password_hash: Some(password_hash),
            created_at: now,
            updated_at: now,
        };

        self.base.create(&user).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, Some(doc! { "full_name": 1 }))
            .await
    }
}
