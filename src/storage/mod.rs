// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Every service owns its own collection; there is no shared schema and no
//! foreign-key enforcement. All services go through the same
//! [`Repository`] interface, implemented once by [`RedbCollection`].
//!
//! ## Layout
//!
//! One redb database holds, per collection:
//!
//! ```text
//! {collection}          id → JSON record
//! {collection}_unique   field␟value → id
//! ```
//!
//! Unique keys are checked and written inside the same write transaction as
//! the record, so uniqueness holds under concurrent inserts.

pub mod query;
pub mod records;
pub mod redb_store;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub use query::{Filter, FindQuery};
pub use records::{ArticleRecord, CommentRecord, FavoriteEdge, FollowEdge, IdentityRecord};
pub use redb_store::{RedbCollection, Store};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A unique key (or the id itself) is already taken.
    #[error("duplicate {field}")]
    Duplicate { field: &'static str },

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Joins the parts of composite index keys (ASCII unit separator).
pub const KEY_SEPARATOR: char = '\u{1f}';

/// A value that must be unique across one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub field: &'static str,
    pub value: String,
}

impl UniqueKey {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Key under which this value is stored in the unique-index table.
    pub fn index_key(&self) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.field, self.value)
    }
}

/// A record persisted in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table) name.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Values that must not repeat within the collection.
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }
}

/// CRUD contract shared by every service.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Records matching `query`, sorted and paginated as it specifies.
    async fn find(&self, query: FindQuery) -> StorageResult<Vec<T>>;

    /// Number of records matching `query`'s filters (pagination ignored).
    async fn count(&self, query: FindQuery) -> StorageResult<usize>;

    async fn get(&self, id: &str) -> StorageResult<Option<T>>;

    /// Records for the given ids; ids with no record are skipped.
    async fn get_many(&self, ids: &[String]) -> StorageResult<Vec<T>>;

    /// Index lookup on one of the entity's unique keys.
    async fn find_unique(&self, field: &'static str, value: &str) -> StorageResult<Option<T>>;

    /// Fails with [`StorageError::Duplicate`] if the id or a unique key is taken.
    async fn insert(&self, entity: T) -> StorageResult<T>;

    /// Shallow-merges the JSON object `patch` into the stored record.
    async fn update_by_id(&self, id: &str, patch: serde_json::Value) -> StorageResult<T>;

    async fn remove_by_id(&self, id: &str) -> StorageResult<T>;

    /// Removes every record matching `query`'s filters; returns how many.
    async fn remove_where(&self, query: FindQuery) -> StorageResult<usize>;
}
