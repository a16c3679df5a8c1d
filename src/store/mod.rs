//! Record store abstraction.
//!
//! The marketplace keeps its state in a small document store: named
//! collections of versioned JSON records. Reads are plain lookups; every
//! write goes through [`RecordStore::apply`], which commits a batch of
//! writes atomically but only if all of its guards still hold. A failed
//! guard aborts the whole batch with [`StoreError::Conflict`] and leaves
//! the store untouched, which is what the purchase path builds its
//! optimistic retry loop on.

pub mod docs;
mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Collections the marketplace persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Numbers,
    Users,
    Transactions,
    Settings,
    /// One claim record per registered email, keyed by the normalized
    /// address. Holds the owning uid.
    EmailIndex,
    /// One claim record per live phone number, keyed by the number itself.
    /// Holds the owning inventory record id.
    PhoneIndex,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Numbers => "numbers",
            Collection::Users => "users",
            Collection::Transactions => "transactions",
            Collection::Settings => "settings",
            Collection::EmailIndex => "email_index",
            Collection::PhoneIndex => "phone_index",
        }
    }
}

/// A stored record together with its commit version. Versions start at 1
/// and increase by one on every successful write to the record.
#[derive(Debug, Clone)]
pub struct RawDoc {
    pub id: String,
    pub version: u64,
    pub data: Value,
}

/// Precondition checked inside the atomic commit of a batch.
#[derive(Debug, Clone)]
pub enum Guard {
    /// The record must exist at exactly this version.
    Matches {
        collection: Collection,
        id: String,
        version: u64,
    },
    /// No record with this id may exist.
    Absent { collection: Collection, id: String },
}

#[derive(Debug, Clone)]
pub enum WriteOp {
    Put {
        collection: Collection,
        id: String,
        data: Value,
    },
    Delete { collection: Collection, id: String },
}

/// Guarded write batch. All guards are checked and all ops applied within
/// a single atomic commit; other writers never observe a partial batch.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub guards: Vec<Guard>,
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard_version(mut self, collection: Collection, id: &str, version: u64) -> Self {
        self.guards.push(Guard::Matches {
            collection,
            id: id.to_string(),
            version,
        });
        self
    }

    pub fn guard_absent(mut self, collection: Collection, id: &str) -> Self {
        self.guards.push(Guard::Absent {
            collection,
            id: id.to_string(),
        });
        self
    }

    pub fn put(mut self, collection: Collection, id: &str, data: Value) -> Self {
        self.ops.push(WriteOp::Put {
            collection,
            id: id.to_string(),
            data,
        });
        self
    }

    pub fn delete(mut self, collection: Collection, id: &str) -> Self {
        self.ops.push(WriteOp::Delete {
            collection,
            id: id.to_string(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("malformed stored document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("record store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Cheap connectivity probe for health reporting.
    async fn ping(&self) -> StoreResult<()>;

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<RawDoc>>;

    /// Every record in the collection, ordered by id.
    async fn list(&self, collection: Collection) -> StoreResult<Vec<RawDoc>>;

    /// Records whose top-level `field` equals `value`, ordered by id.
    async fn find_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<RawDoc>>;

    /// Atomically check all guards and apply all ops, or fail with
    /// [`StoreError::Conflict`] and no effects.
    async fn apply(&self, batch: WriteBatch) -> StoreResult<()>;
}
