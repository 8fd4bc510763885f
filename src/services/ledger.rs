// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Edge ledger shared by favorites and follows.
//!
//! Both services own a set of unique `(subject, actor)` pairs and answer the
//! same questions about it; only the field names and error variants differ.

use crate::error::{ServiceError, ServiceResult};
use crate::storage::records::pair_key;
use crate::storage::{Entity, Filter, FindQuery, Repository, StorageError};

/// A `(subject, actor)` pair record.
pub trait Edge: Entity {
    /// Field naming the thing acted on (`article`, `follow`).
    const SUBJECT: &'static str;
    /// Field naming who acted (`user`).
    const ACTOR: &'static str;

    fn new(subject: String, actor: String) -> Self;

    fn subject(&self) -> &str;

    fn actor(&self) -> &str;

    /// Error for adding a pair that already exists.
    fn duplicate() -> ServiceError;

    /// Error for deleting a pair that does not exist.
    fn missing() -> ServiceError;
}

pub struct Ledger<E: Edge> {
    repo: Box<dyn Repository<E>>,
}

impl<E: Edge> Ledger<E> {
    pub fn new(repo: impl Repository<E> + 'static) -> Self {
        Self {
            repo: Box::new(repo),
        }
    }

    pub async fn add(&self, subject: &str, actor: &str) -> ServiceResult<E> {
        require(E::SUBJECT, subject)?;
        require(E::ACTOR, actor)?;

        match self.repo.insert(E::new(subject.into(), actor.into())).await {
            Ok(edge) => Ok(edge),
            Err(StorageError::Duplicate { .. }) => Err(E::duplicate()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn has(&self, subject: &str, actor: &str) -> ServiceResult<bool> {
        Ok(self.find(subject, actor).await?.is_some())
    }

    /// Edges matching exactly one of `subject` or `actor`.
    pub async fn count(&self, subject: Option<&str>, actor: Option<&str>) -> ServiceResult<usize> {
        let filter = match (subject, actor) {
            (Some(subject), None) => Filter::eq(E::SUBJECT, subject),
            (None, Some(actor)) => Filter::eq(E::ACTOR, actor),
            _ => {
                return Err(ServiceError::validation(format!(
                    "Exactly one of `{}` or `{}` is required",
                    E::SUBJECT,
                    E::ACTOR
                )))
            }
        };
        Ok(self.repo.count(FindQuery::new().filter(filter)).await?)
    }

    pub async fn delete(&self, subject: &str, actor: &str) -> ServiceResult<E> {
        let edge = self.find(subject, actor).await?.ok_or_else(E::missing)?;
        match self.repo.remove_by_id(edge.id()).await {
            Ok(edge) => Ok(edge),
            // Lost a race with a concurrent delete.
            Err(StorageError::NotFound(_)) => Err(E::missing()),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop every edge pointing at `subject`.
    pub async fn remove_by_subject(&self, subject: &str) -> ServiceResult<usize> {
        let query = FindQuery::new().filter(Filter::eq(E::SUBJECT, subject));
        Ok(self.repo.remove_where(query).await?)
    }

    /// Subjects `actor` has edges to, newest first.
    pub async fn subjects_of(&self, actor: &str) -> ServiceResult<Vec<String>> {
        let query = FindQuery::new()
            .filter(Filter::eq(E::ACTOR, actor))
            .sort_desc("createdAt");
        let edges = self.repo.find(query).await?;
        Ok(edges.iter().map(|e| e.subject().to_string()).collect())
    }

    async fn find(&self, subject: &str, actor: &str) -> ServiceResult<Option<E>> {
        Ok(self
            .repo
            .find_unique("pair", &pair_key(subject, actor))
            .await?)
    }
}

fn require(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("`{field}` must not be empty")));
    }
    Ok(())
}
