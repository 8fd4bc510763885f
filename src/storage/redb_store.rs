// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded collection store backed by redb (pure Rust, ACID).
//!
//! redb is synchronous; every operation runs on tokio's blocking pool so
//! async callers never stall an executor thread on disk I/O.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::backends::InMemoryBackend;
use redb::{Builder, Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::Value;

use super::{Entity, FindQuery, Repository, StorageError, StorageResult, UniqueKey};

fn records_table(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

fn unique_table(name: &str) -> TableDefinition<'_, &'static str, &'static str> {
    TableDefinition::new(name)
}

fn decode<T: Entity>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Handle to the database shared by every collection.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Volatile database; contents vanish with the process.
    pub fn in_memory() -> StorageResult<Self> {
        let db = Builder::new().create_with_backend(InMemoryBackend::new())?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Typed collection for `T`, creating its tables on first use.
    pub fn collection<T: Entity>(&self) -> StorageResult<RedbCollection<T>> {
        let records = T::COLLECTION.to_string();
        let unique = format!("{}_unique", T::COLLECTION);

        // Pre-create tables so later read transactions don't fail
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(records_table(&records))?;
            let _ = write_txn.open_table(unique_table(&unique))?;
        }
        write_txn.commit()?;

        Ok(RedbCollection {
            db: Arc::clone(&self.db),
            records: records.into(),
            unique: unique.into(),
            _entity: PhantomData,
        })
    }
}

/// [`Repository`] over one redb records table plus its unique index.
pub struct RedbCollection<T> {
    db: Arc<Database>,
    records: Arc<str>,
    unique: Arc<str>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> RedbCollection<T> {
    async fn blocking<R, F>(&self, op: F) -> StorageResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&Database, &str, &str) -> StorageResult<R> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let records = Arc::clone(&self.records);
        let unique = Arc::clone(&self.unique);
        tokio::task::spawn_blocking(move || op(&db, &records, &unique)).await?
    }
}

/// Every record of a table as JSON, in key order.
fn scan(db: &Database, records: &str) -> StorageResult<Vec<Value>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(records_table(records))?;
    let mut docs = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        docs.push(serde_json::from_slice(value.value())?);
    }
    Ok(docs)
}

fn read_one<T: Entity>(db: &Database, records: &str, id: &str) -> StorageResult<Option<T>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(records_table(records))?;
    let found = match table.get(id)? {
        Some(value) => Some(decode(value.value())?),
        None => None,
    };
    Ok(found)
}

/// Shallow merge: top-level keys of `patch` replace those of `doc`.
fn merge(doc: &mut Value, patch: Value) {
    if let (Some(target), Value::Object(changes)) = (doc.as_object_mut(), patch) {
        for (key, value) in changes {
            target.insert(key, value);
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for RedbCollection<T> {
    async fn find(&self, query: FindQuery) -> StorageResult<Vec<T>> {
        self.blocking(move |db, records, _| {
            query
                .apply(scan(db, records)?)
                .into_iter()
                .map(|doc| serde_json::from_value(doc).map_err(StorageError::from))
                .collect()
        })
        .await
    }

    async fn count(&self, query: FindQuery) -> StorageResult<usize> {
        self.blocking(move |db, records, _| {
            Ok(scan(db, records)?.iter().filter(|doc| query.matches(doc)).count())
        })
        .await
    }

    async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        let id = id.to_owned();
        self.blocking(move |db, records, _| read_one(db, records, &id))
            .await
    }

    async fn get_many(&self, ids: &[String]) -> StorageResult<Vec<T>> {
        let ids = ids.to_vec();
        self.blocking(move |db, records, _| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(records_table(records))?;
            let mut found = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(value) = table.get(id.as_str())? {
                    found.push(decode(value.value())?);
                }
            }
            Ok(found)
        })
        .await
    }

    async fn find_unique(&self, field: &'static str, value: &str) -> StorageResult<Option<T>> {
        let key = UniqueKey::new(field, value).index_key();
        self.blocking(move |db, records, unique| {
            let id = {
                let read_txn = db.begin_read()?;
                let index = read_txn.open_table(unique_table(unique))?;
                match index.get(key.as_str())? {
                    Some(id) => id.value().to_owned(),
                    None => return Ok(None),
                }
            };
            read_one(db, records, &id)
        })
        .await
    }

    async fn insert(&self, entity: T) -> StorageResult<T> {
        let id = entity.id().to_owned();
        let keys = entity.unique_keys();
        let bytes = serde_json::to_vec(&entity)?;

        self.blocking(move |db, records, unique| {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(records_table(records))?;
                let mut index = write_txn.open_table(unique_table(unique))?;

                if table.get(id.as_str())?.is_some() {
                    return Err(StorageError::Duplicate { field: "id" });
                }
                for key in &keys {
                    if index.get(key.index_key().as_str())?.is_some() {
                        return Err(StorageError::Duplicate { field: key.field });
                    }
                }

                table.insert(id.as_str(), bytes.as_slice())?;
                for key in &keys {
                    index.insert(key.index_key().as_str(), id.as_str())?;
                }
            }
            write_txn.commit()?;
            Ok(())
        })
        .await?;

        Ok(entity)
    }

    async fn update_by_id(&self, id: &str, patch: Value) -> StorageResult<T> {
        let id = id.to_owned();
        self.blocking(move |db, records, unique| {
            let write_txn = db.begin_write()?;
            let updated = {
                let mut table = write_txn.open_table(records_table(records))?;
                let mut index = write_txn.open_table(unique_table(unique))?;

                let current: T = match table.get(id.as_str())? {
                    Some(value) => decode(value.value())?,
                    None => {
                        return Err(StorageError::NotFound(format!("{} {id}", T::COLLECTION)))
                    }
                };

                let mut doc = serde_json::to_value(&current)?;
                merge(&mut doc, patch);
                merge(&mut doc, serde_json::json!({ "id": id }));
                let updated: T = serde_json::from_value(doc)?;

                let old_keys = current.unique_keys();
                let new_keys = updated.unique_keys();
                let added: Vec<&UniqueKey> =
                    new_keys.iter().filter(|k| !old_keys.contains(k)).collect();

                for key in &added {
                    if index.get(key.index_key().as_str())?.is_some() {
                        return Err(StorageError::Duplicate { field: key.field });
                    }
                }
                for key in old_keys.iter().filter(|k| !new_keys.contains(k)) {
                    index.remove(key.index_key().as_str())?;
                }
                for key in &added {
                    index.insert(key.index_key().as_str(), id.as_str())?;
                }

                let bytes = serde_json::to_vec(&updated)?;
                table.insert(id.as_str(), bytes.as_slice())?;
                updated
            };
            write_txn.commit()?;
            Ok(updated)
        })
        .await
    }

    async fn remove_by_id(&self, id: &str) -> StorageResult<T> {
        let id = id.to_owned();
        self.blocking(move |db, records, unique| {
            let write_txn = db.begin_write()?;
            let removed = {
                let mut table = write_txn.open_table(records_table(records))?;
                let mut index = write_txn.open_table(unique_table(unique))?;

                let removed: T = match table.remove(id.as_str())? {
                    Some(value) => decode(value.value())?,
                    None => {
                        return Err(StorageError::NotFound(format!("{} {id}", T::COLLECTION)))
                    }
                };
                for key in removed.unique_keys() {
                    index.remove(key.index_key().as_str())?;
                }
                removed
            };
            write_txn.commit()?;
            Ok(removed)
        })
        .await
    }

    async fn remove_where(&self, query: FindQuery) -> StorageResult<usize> {
        self.blocking(move |db, records, unique| {
            let write_txn = db.begin_write()?;
            let removed = {
                let mut table = write_txn.open_table(records_table(records))?;
                let mut index = write_txn.open_table(unique_table(unique))?;

                let mut doomed: Vec<(String, Vec<UniqueKey>)> = Vec::new();
                for entry in table.iter()? {
                    let (key, value) = entry?;
                    let doc: Value = serde_json::from_slice(value.value())?;
                    if query.matches(&doc) {
                        let record: T = serde_json::from_value(doc)?;
                        doomed.push((key.value().to_owned(), record.unique_keys()));
                    }
                }

                for (id, keys) in &doomed {
                    table.remove(id.as_str())?;
                    for key in keys {
                        index.remove(key.index_key().as_str())?;
                    }
                }
                doomed.len()
            };
            write_txn.commit()?;
            Ok(removed)
        })
        .await
    }
}
