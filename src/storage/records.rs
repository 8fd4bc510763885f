// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted records, one per owning service.
//!
//! Derived fields (`favorited`, `favoritesCount`, `following`) are never
//! stored here; they are recomputed from the ledgers on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, UniqueKey, KEY_SEPARATOR};

/// Generate a new time-ordered record id.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Registered account. `password` holds the argon2 PHC hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub id: String,
    pub username: String,
    /// Stored lowercased.
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for IdentityRecord {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("username", &self.username),
            UniqueKey::new("email", &self.email),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(default)]
    pub tag_list: Vec<String>,
    /// Identity id of the author.
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for ArticleRecord {
    const COLLECTION: &'static str = "articles";

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("slug", &self.slug)]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: String,
    /// Article id.
    pub article: String,
    /// Identity id of the author.
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CommentRecord {
    const COLLECTION: &'static str = "comments";

    fn id(&self) -> &str {
        &self.id
    }
}

/// `user` favorited `article`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEdge {
    pub id: String,
    pub article: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

/// `user` follows `follow`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdge {
    pub id: String,
    pub user: String,
    pub follow: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for FavoriteEdge {
    const COLLECTION: &'static str = "favorites";

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("pair", pair_key(&self.article, &self.user))]
    }
}

impl Entity for FollowEdge {
    const COLLECTION: &'static str = "follows";

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("pair", pair_key(&self.follow, &self.user))]
    }
}

/// Unique-index value of an edge: subject and actor joined by [`KEY_SEPARATOR`].
pub fn pair_key(subject: &str, actor: &str) -> String {
    format!("{subject}{KEY_SEPARATOR}{actor}")
}
