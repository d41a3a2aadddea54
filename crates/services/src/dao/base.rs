use std::marker::PhantomData;
use std::sync::Arc;

use bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use studyx_db::store::{FindOptions, RecordStore, StoreError, UpdateOutcome};
use thiserror::Error;
use tracing::debug;

use crate::realtime::ChangeFeed;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
    #[error("Entity not found")]
    NotFound,
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation: {0}")]
    Validation(String),
}

impl From<StoreError> for DaoError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey(msg) => DaoError::DuplicateKey(msg),
            other => DaoError::Store(other),
        }
    }
}

pub type DaoResult<T> = Result<T, DaoError>;

/// Handles shared by every DAO: the record store and the insert feed.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn RecordStore>,
    pub feed: ChangeFeed,
}

impl Backend {
    pub fn new(store: Arc<dyn RecordStore>, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }
}

pub struct BaseDao<T> {
    store: Arc<dyn RecordStore>,
    feed: ChangeFeed,
    collection: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BaseDao<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
{
    pub fn new(backend: &Backend, collection: &'static str) -> Self {
        Self {
            store: backend.store.clone(),
            feed: backend.feed.clone(),
            collection,
            _marker: PhantomData,
        }
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<T> {
        self.find_one(doc! { "_id": id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_one(&self, filter: Document) -> DaoResult<Option<T>> {
        match self.store.find_one(self.collection, filter).await? {
            Some(doc) => Ok(Some(bson::from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn find_many(&self, filter: Document, sort: Option<Document>) -> DaoResult<Vec<T>> {
        self.find_with(
            filter,
            FindOptions {
                sort,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn find_with(&self, filter: Document, options: FindOptions) -> DaoResult<Vec<T>> {
        let docs = self.store.find(self.collection, filter, options).await?;
        docs.into_iter()
            .map(|d| bson::from_document(d).map_err(DaoError::from))
            .collect()
    }

    /// Inserts and announces the stored document on the change feed.
    pub async fn insert_one(&self, item: &T) -> DaoResult<ObjectId> {
        let mut doc = bson::to_document(item)?;
        let id = self.store.insert_one(self.collection, doc.clone()).await?;
        doc.insert("_id", id);
        debug!(collection = self.collection, %id, "Inserted document");
        self.feed.publish(self.collection, doc);
        Ok(id)
    }

    /// Inserts and reads the record back.
    pub async fn create(&self, item: &T) -> DaoResult<T> {
        let id = self.insert_one(item).await?;
        self.find_by_id(id).await
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> DaoResult<bool> {
        let outcome = self
            .store
            .update_one(self.collection, filter, update, false)
            .await?;
        Ok(outcome.matched > 0)
    }

    pub async fn upsert(&self, filter: Document, update: Document) -> DaoResult<UpdateOutcome> {
        Ok(self
            .store
            .update_one(self.collection, filter, update, true)
            .await?)
    }

    pub async fn hard_delete(&self, filter: Document) -> DaoResult<u64> {
        Ok(self.store.delete_many(self.collection, filter).await?)
    }

    pub async fn count(&self, filter: Document) -> DaoResult<u64> {
        Ok(self.store.count(self.collection, filter).await?)
    }
}
