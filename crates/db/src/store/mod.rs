//! Record store seam.
//!
//! Everything above this crate talks to collections of BSON documents through
//! [`RecordStore`]. Two backends exist: MongoDB for deployments and an
//! in-process store used by tests and `database.backend = "memory"`.

pub mod filter;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::{Document, oid::ObjectId};
use thiserror::Error;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn sorted(sort: Document) -> Self {
        Self {
            sort: Some(sort),
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    pub upserted_id: Option<ObjectId>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>>;

    /// Inserts `doc`, assigning an `_id` when it has none.
    async fn insert_one(&self, collection: &str, doc: Document) -> StoreResult<ObjectId>;

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome>;

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    async fn ping(&self) -> StoreResult<()>;
}
