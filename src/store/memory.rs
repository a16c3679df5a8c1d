//! In-memory record store, the default backend for development and tests.
//!
//! `apply` takes the write lock for the whole guard-check-then-write
//! sequence, so concurrent batches are serialized exactly like the SQL
//! backend's transactions.

use super::{Collection, Guard, RawDoc, RecordStore, StoreError, StoreResult, WriteBatch, WriteOp};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredDoc {
    version: u64,
    data: Value,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<(Collection, String), StoredDoc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<RawDoc>> {
        let records = self.records.read().await;
        Ok(records
            .get(&(collection, id.to_string()))
            .map(|doc| RawDoc {
                id: id.to_string(),
                version: doc.version,
                data: doc.data.clone(),
            }))
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<RawDoc>> {
        let records = self.records.read().await;
        let mut docs: Vec<RawDoc> = records
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .map(|((_, id), doc)| RawDoc {
                id: id.clone(),
                version: doc.version,
                data: doc.data.clone(),
            })
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn find_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<RawDoc>> {
        let records = self.records.read().await;
        let mut docs: Vec<RawDoc> = records
            .iter()
            .filter(|((c, _), doc)| *c == collection && doc.data.get(field) == Some(value))
            .map(|((_, id), doc)| RawDoc {
                id: id.clone(),
                version: doc.version,
                data: doc.data.clone(),
            })
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut records = self.records.write().await;

        for guard in &batch.guards {
            match guard {
                Guard::Matches {
                    collection,
                    id,
                    version,
                } => match records.get(&(*collection, id.clone())) {
                    Some(doc) if doc.version == *version => {}
                    Some(_) => {
                        return Err(StoreError::Conflict(format!(
                            "{}/{} was modified concurrently",
                            collection.as_str(),
                            id
                        )))
                    }
                    None => {
                        return Err(StoreError::Conflict(format!(
                            "{}/{} no longer exists",
                            collection.as_str(),
                            id
                        )))
                    }
                },
                Guard::Absent { collection, id } => {
                    if records.contains_key(&(*collection, id.clone())) {
                        return Err(StoreError::Conflict(format!(
                            "{}/{} already exists",
                            collection.as_str(),
                            id
                        )));
                    }
                }
            }
        }

        for op in batch.ops {
            match op {
                WriteOp::Put {
                    collection,
                    id,
                    data,
                } => match records.get_mut(&(collection, id.clone())) {
                    Some(doc) => {
                        doc.version += 1;
                        doc.data = data;
                    }
                    None => {
                        records.insert((collection, id), StoredDoc { version: 1, data });
                    }
                },
                WriteOp::Delete { collection, id } => {
                    records.remove(&(collection, id));
                }
            }
        }

        Ok(())
    }
}
