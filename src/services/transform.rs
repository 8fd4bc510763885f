// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-path transform for articles and comments.
//!
//! Input documents have their `author` already populated. The transform adds
//! the viewer-relative derived fields, which are never stored:
//!
//! - articles: `favorited`, `favoritesCount`
//! - authors: `following`
//!
//! and strips internal fields (an article's `id`, a comment's `article`,
//! an author's `id`). Batches keep their order and resolve each item's
//! lookups concurrently.

use futures_util::future::try_join_all;
use futures_util::try_join;
use serde_json::{json, Value};

use crate::broker::Context;
use crate::error::ServiceResult;

pub async fn article(ctx: &Context, mut doc: Value) -> ServiceResult<Value> {
    let id = take_string(&mut doc, "id");
    let author = author_id(&doc);

    let favorited = async {
        match (ctx.caller(), &id) {
            (Some(caller), Some(id)) => {
                ctx.call_as::<bool, _>("favorites.has", json!({ "article": id, "user": caller.id }))
                    .await
            }
            _ => Ok(false),
        }
    };
    let favorites_count = async {
        match &id {
            Some(id) => {
                ctx.call_as::<u64, _>("favorites.count", json!({ "article": id }))
                    .await
            }
            None => Ok(0),
        }
    };
    let following = following(ctx, author.as_deref());

    let (favorited, favorites_count, following) =
        try_join!(favorited, favorites_count, following)?;

    if let Some(obj) = doc.as_object_mut() {
        obj.insert("favorited".into(), json!(favorited));
        obj.insert("favoritesCount".into(), json!(favorites_count));
    }
    finish_author(&mut doc, following);
    Ok(doc)
}

pub async fn articles(ctx: &Context, docs: Vec<Value>) -> ServiceResult<Vec<Value>> {
    try_join_all(docs.into_iter().map(|doc| article(ctx, doc))).await
}

pub async fn comment(ctx: &Context, mut doc: Value) -> ServiceResult<Value> {
    if let Some(obj) = doc.as_object_mut() {
        obj.remove("article");
    }
    let author = author_id(&doc);
    let following = following(ctx, author.as_deref()).await?;
    finish_author(&mut doc, following);
    Ok(doc)
}

pub async fn comments(ctx: &Context, docs: Vec<Value>) -> ServiceResult<Vec<Value>> {
    try_join_all(docs.into_iter().map(|doc| comment(ctx, doc))).await
}

/// Whether the caller follows `author`. Anonymous callers follow nobody.
async fn following(ctx: &Context, author: Option<&str>) -> ServiceResult<bool> {
    match (ctx.caller(), author) {
        (Some(caller), Some(author)) if caller.id != author => {
            ctx.call_as("follows.has", json!({ "user": caller.id, "follow": author }))
                .await
        }
        _ => Ok(false),
    }
}

fn author_id(doc: &Value) -> Option<String> {
    doc.get("author")?.get("id")?.as_str().map(str::to_string)
}

fn finish_author(doc: &mut Value, following: bool) {
    if let Some(author) = doc.get_mut("author").and_then(Value::as_object_mut) {
        author.remove("id");
        author.insert("following".into(), json!(following));
    }
}

fn take_string(doc: &mut Value, field: &str) -> Option<String> {
    match doc.as_object_mut()?.remove(field)? {
        Value::String(s) => Some(s),
        _ => None,
    }
}
