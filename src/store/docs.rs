//! Typed access on top of the raw record store.

use super::{Collection, RawDoc, RecordStore, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A decoded record paired with the store version it was read at. The
/// version feeds the write guards of the batch that updates the record.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

pub fn decode<T: DeserializeOwned>(doc: RawDoc) -> StoreResult<Versioned<T>> {
    Ok(Versioned {
        version: doc.version,
        record: serde_json::from_value(doc.data)?,
    })
}

pub fn encode<T: Serialize>(record: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(record)?)
}

pub async fn fetch<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    id: &str,
) -> StoreResult<Option<Versioned<T>>> {
    match store.get(collection, id).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn fetch_all<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
) -> StoreResult<Vec<Versioned<T>>> {
    store
        .list(collection)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

pub async fn find_eq<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    field: &str,
    value: &Value,
) -> StoreResult<Vec<Versioned<T>>> {
    store
        .find_eq(collection, field, value)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}
