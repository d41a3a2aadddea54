use std::collections::HashMap;

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use parking_lot::RwLock;
use tracing::debug;

use super::filter::{apply_update, lookup, matches, sort_documents, upsert_seed};
use super::{FindOptions, RecordStore, StoreError, StoreResult, UpdateOutcome};
use crate::indexes::{UNIQUE_KEYS, UniqueKey};

/// Process-local store. The lock is never held across an await point.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unique_keys: &'static [UniqueKey],
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            unique_keys: UNIQUE_KEYS,
        }
    }

    /// Rejects `candidate` if another document in `docs` (other than the one
    /// at `skip`) already holds the same `_id` or the same values for a unique
    /// key. Keys whose fields are missing or null on the candidate are not
    /// enforced.
    fn check_unique(
        &self,
        collection: &str,
        docs: &[Document],
        candidate: &Document,
        skip: Option<usize>,
    ) -> StoreResult<()> {
        let others = || {
            docs.iter()
                .enumerate()
                .filter(move |(i, _)| Some(*i) != skip)
                .map(|(_, d)| d)
        };

        if let Some(id) = candidate.get("_id") {
            if others().any(|d| d.get("_id") == Some(id)) {
                return Err(StoreError::DuplicateKey(format!(
                    "{} _id {}",
                    collection, id
                )));
            }
        }

        for key in self.unique_keys.iter().filter(|k| k.collection == collection) {
            let values: Option<Vec<&Bson>> = key
                .fields
                .iter()
                .map(|f| lookup(candidate, f).filter(|v| !matches!(v, Bson::Null)))
                .collect();
            let Some(values) = values else { continue };

            let clash = others().any(|d| {
                key.fields
                    .iter()
                    .zip(values.iter())
                    .all(|(f, v)| lookup(d, f) == Some(*v))
            });
            if clash {
                return Err(StoreError::DuplicateKey(format!(
                    "{} {}",
                    collection,
                    key.fields.join(", ")
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut found: Vec<Document> = {
            let collections = self.collections.read();
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| matches(d, &filter))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(sort) = &options.sort {
            sort_documents(&mut found, sort);
        }
        let skip = options.skip.unwrap_or(0) as usize;
        let found = found.into_iter().skip(skip);
        Ok(match options.limit {
            Some(limit) if limit > 0 => found.take(limit as usize).collect(),
            _ => found.collect(),
        })
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, &filter)).cloned()))
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> StoreResult<ObjectId> {
        let id = match doc.get_object_id("_id") {
            Ok(id) => id,
            Err(_) => {
                let id = ObjectId::new();
                doc.insert("_id", id);
                id
            }
        };

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        self.check_unique(collection, docs, &doc, None)?;
        docs.push(doc);
        debug!(collection, %id, "Inserted document");
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> StoreResult<UpdateOutcome> {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();

        if let Some(index) = docs.iter().position(|d| matches(d, &filter)) {
            let mut updated = docs[index].clone();
            apply_update(&mut updated, &update, false)?;
            self.check_unique(collection, docs, &updated, Some(index))?;
            let modified = updated != docs[index];
            docs[index] = updated;
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(modified),
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome::default());
        }

        let mut created = upsert_seed(&filter);
        apply_update(&mut created, &update, true)?;
        let id = match created.get_object_id("_id") {
            Ok(id) => id,
            Err(_) => {
                let id = ObjectId::new();
                created.insert("_id", id);
                id
            }
        };
        self.check_unique(collection, docs, &created, None)?;
        docs.push(created);
        debug!(collection, %id, "Upserted document");
        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted_id: Some(id),
        })
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !matches(d, &filter));
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matches(d, &filter)).count() as u64)
            .unwrap_or(0))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
