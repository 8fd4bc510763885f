// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relation Population
//!
//! Replaces foreign-id fields with the documents they point at, fetched from
//! the owning service through the broker.
//!
//! Each consuming service declares a static [`Relations`] table:
//!
//! ```rust,ignore
//! const COMMENT_RELATIONS: Relations = Relations(&[
//!     Relation::new("author", "users.lookup").fields(&["id", "username"]),
//! ]);
//! ```
//!
//! For a batch of documents the engine issues **one** `lookup` call per
//! requested relation, carrying the distinct ids found in that field across
//! the whole batch. Relations resolve concurrently. Ids that resolve to
//! nothing become `null`; list-valued fields stay lists.
//!
//! ## Lookup contract
//!
//! Every populate target exposes an internal `lookup` action taking
//! [`LookupParams`]. A target populates its own relations (the nested
//! `populate` list) before projecting `fields`, so population recurses
//! through as many services as the relation tables chain together. Depth is
//! bounded by the broker's call level.

use std::collections::{HashMap, HashSet};

use futures_util::future::try_join_all;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::broker::Context;
use crate::error::{ServiceError, ServiceResult};

/// How to resolve one foreign-id field.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    /// Field holding the id (or list of ids).
    pub field: &'static str,
    /// Target `lookup` action, e.g. `"users.lookup"`.
    pub action: &'static str,
    /// Projection applied by the target; empty keeps every field.
    pub fields: &'static [&'static str],
    /// Relations the target should populate in turn.
    pub populate: &'static [&'static str],
}

impl Relation {
    pub const fn new(field: &'static str, action: &'static str) -> Self {
        Self {
            field,
            action,
            fields: &[],
            populate: &[],
        }
    }

    pub const fn fields(mut self, fields: &'static [&'static str]) -> Self {
        self.fields = fields;
        self
    }

    pub const fn populate(mut self, populate: &'static [&'static str]) -> Self {
        self.populate = populate;
        self
    }
}

/// A service's relation table.
#[derive(Debug, Clone, Copy)]
pub struct Relations(pub &'static [Relation]);

impl Relations {
    pub fn get(&self, field: &str) -> Option<&'static Relation> {
        self.0.iter().find(|r| r.field == field)
    }
}

/// One id or many.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdList {
    One(String),
    Many(Vec<String>),
}

/// Params of every `lookup` action.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupParams {
    pub id: IdList,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub populate: Vec<String>,
}

impl LookupParams {
    pub fn ids(&self) -> Vec<String> {
        match &self.id {
            IdList::One(id) => vec![id.clone()],
            IdList::Many(ids) => ids.clone(),
        }
    }
}

/// Resolve `requested` relations on every document of `docs` in place.
pub async fn populate<S: AsRef<str>>(
    ctx: &Context,
    docs: &mut [Value],
    relations: &Relations,
    requested: &[S],
) -> ServiceResult<()> {
    let mut batches = Vec::new();
    for name in requested {
        let name = name.as_ref();
        let Some(relation) = relations.get(name) else {
            debug!(relation = name, "ignoring unknown relation");
            continue;
        };
        let ids = distinct_ids(docs, relation.field);
        if !ids.is_empty() {
            batches.push((relation, ids));
        }
    }
    if batches.is_empty() {
        return Ok(());
    }

    let resolved = try_join_all(
        batches
            .into_iter()
            .map(|(relation, ids)| resolve(ctx, relation, ids)),
    )
    .await?;

    for (relation, by_id) in resolved {
        for doc in docs.iter_mut() {
            if let Some(slot) = doc.get_mut(relation.field) {
                substitute(slot, &by_id);
            }
        }
    }
    Ok(())
}

/// Answer a `lookup` call: populate, project, then shape by the id form.
///
/// `docs` are the target's own documents for `params.ids()`, in any order.
pub async fn lookup(
    ctx: &Context,
    params: &LookupParams,
    mut docs: Vec<Value>,
    relations: &Relations,
) -> ServiceResult<Value> {
    populate(ctx, &mut docs, relations, params.populate.as_slice()).await?;
    let mut docs: Vec<Value> = docs
        .into_iter()
        .map(|doc| project(doc, params.fields.as_slice()))
        .collect();

    Ok(match params.id {
        IdList::One(_) => docs.pop().unwrap_or(Value::Null),
        IdList::Many(_) => Value::Array(docs),
    })
}

/// Keep only `fields` (plus `id`). An empty list keeps everything.
pub fn project<S: AsRef<str>>(doc: Value, fields: &[S]) -> Value {
    if fields.is_empty() {
        return doc;
    }
    match doc {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| key == "id" || fields.iter().any(|f| f.as_ref() == key))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

async fn resolve(
    ctx: &Context,
    relation: &'static Relation,
    ids: Vec<String>,
) -> ServiceResult<(&'static Relation, HashMap<String, Value>)> {
    let found = ctx
        .call(
            relation.action,
            json!({
                "id": ids,
                "fields": relation.fields,
                "populate": relation.populate,
            }),
        )
        .await?;

    let Value::Array(found) = found else {
        return Err(ServiceError::internal(format!(
            "{} returned a non-list for a batch lookup",
            relation.action
        )));
    };

    let by_id = found
        .into_iter()
        .filter_map(|doc| {
            let id = doc.get("id")?.as_str()?.to_string();
            Some((id, doc))
        })
        .collect();
    Ok((relation, by_id))
}

fn distinct_ids(docs: &[Value], field: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut push = |id: &str| {
        if !id.is_empty() && seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    };

    for doc in docs {
        match doc.get(field) {
            Some(Value::String(id)) => push(id.as_str()),
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).for_each(&mut push),
            _ => {}
        }
    }
    ids
}

fn substitute(slot: &mut Value, by_id: &HashMap<String, Value>) {
    let resolve_one = |v: &Value| {
        v.as_str()
            .and_then(|id| by_id.get(id))
            .cloned()
            .unwrap_or(Value::Null)
    };
    match slot {
        Value::String(_) => *slot = resolve_one(&*slot),
        Value::Array(items) => {
            for item in items.iter_mut() {
                *item = resolve_one(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{parse_params, ActionDef, Broker, Service};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Lookup target over a fixed set of people; records every batch.
    struct People {
        calls: Arc<AtomicUsize>,
        batches: Arc<Mutex<Vec<Vec<String>>>>,
    }

    const LOOKUP: &[ActionDef] = &[ActionDef::internal("lookup")];

    #[async_trait]
    impl Service for People {
        fn name(&self) -> &'static str {
            "people"
        }

        fn actions(&self) -> &'static [ActionDef] {
            LOOKUP
        }

        async fn call(&self, _action: &str, params: Value, ctx: &Context) -> ServiceResult<Value> {
            let params: LookupParams = parse_params(params)?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().unwrap().push(params.ids());

            let docs = params
                .ids()
                .into_iter()
                .filter(|id| id != "ghost")
                .map(|id| json!({"id": id, "name": format!("name-{id}"), "secret": "x"}))
                .collect();
            lookup(ctx, &params, docs, &Relations(&[])).await
        }
    }

    const POST_RELATIONS: Relations = Relations(&[Relation::new("author", "people.lookup")
        .fields(&["name"])]);

    /// Second-level target whose own `author` points at `people`.
    struct Posts;

    #[async_trait]
    impl Service for Posts {
        fn name(&self) -> &'static str {
            "posts"
        }

        fn actions(&self) -> &'static [ActionDef] {
            LOOKUP
        }

        async fn call(&self, _action: &str, params: Value, ctx: &Context) -> ServiceResult<Value> {
            let params: LookupParams = parse_params(params)?;
            let docs = params
                .ids()
                .into_iter()
                .map(|id| json!({"id": id, "title": format!("t-{id}"), "author": "p1"}))
                .collect();
            lookup(ctx, &params, docs, &POST_RELATIONS).await
        }
    }

    const NOTE_RELATIONS: Relations = Relations(&[
        Relation::new("author", "people.lookup").fields(&["name"]),
        Relation::new("readers", "people.lookup").fields(&["name"]),
        Relation::new("post", "posts.lookup")
            .fields(&["title", "author"])
            .populate(&["author"]),
    ]);

    struct Harness {
        broker: Broker,
        calls: Arc<AtomicUsize>,
        batches: Arc<Mutex<Vec<Vec<String>>>>,
    }

    fn harness() -> Harness {
        let calls = Arc::new(AtomicUsize::new(0));
        let batches = Arc::new(Mutex::new(Vec::new()));
        let broker = Broker::builder()
            .service(People {
                calls: Arc::clone(&calls),
                batches: Arc::clone(&batches),
            })
            .service(Posts)
            .build();
        Harness {
            broker,
            calls,
            batches,
        }
    }

    fn ctx(broker: &Broker) -> Context {
        Context::new(broker.clone(), None, 1)
    }

    #[tokio::test]
    async fn one_batched_call_per_relation() {
        let h = harness();
        let mut docs = vec![
            json!({"id": "n1", "author": "p1"}),
            json!({"id": "n2", "author": "p2"}),
            json!({"id": "n3", "author": "p1"}),
            json!({"id": "n4", "author": "p2"}),
        ];

        populate(&ctx(&h.broker), &mut docs, &NOTE_RELATIONS, &["author"])
            .await
            .unwrap();

        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*h.batches.lock().unwrap(), vec![vec!["p1".to_string(), "p2".to_string()]]);
        assert_eq!(docs[2]["author"], json!({"id": "p1", "name": "name-p1"}));
        assert!(docs[0]["author"].get("secret").is_none());
    }

    #[tokio::test]
    async fn missing_ids_become_null_and_lists_stay_lists() {
        let h = harness();
        let mut docs = vec![json!({"id": "n1", "author": "ghost", "readers": ["p1", "ghost"]})];

        populate(&ctx(&h.broker), &mut docs, &NOTE_RELATIONS, &["author", "readers"])
            .await
            .unwrap();

        assert_eq!(docs[0]["author"], Value::Null);
        assert_eq!(
            docs[0]["readers"],
            json!([{"id": "p1", "name": "name-p1"}, null])
        );
    }

    #[tokio::test]
    async fn nested_population_recurses_through_targets() {
        let h = harness();
        let mut docs = vec![json!({"id": "n1", "post": "s1"})];

        populate(&ctx(&h.broker), &mut docs, &NOTE_RELATIONS, &["post"])
            .await
            .unwrap();

        assert_eq!(
            docs[0]["post"],
            json!({"id": "s1", "title": "t-s1", "author": {"id": "p1", "name": "name-p1"}})
        );
    }

    #[tokio::test]
    async fn unknown_relations_and_empty_batches_make_no_calls() {
        let h = harness();
        let mut docs = vec![json!({"id": "n1"})];

        populate(&ctx(&h.broker), &mut docs, &NOTE_RELATIONS, &["author", "nope"])
            .await
            .unwrap();

        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert_eq!(docs[0], json!({"id": "n1"}));
    }

    #[tokio::test]
    async fn scalar_lookup_returns_document_or_null() {
        let h = harness();
        let found = h
            .broker
            .call("people.lookup", json!({"id": "p9", "fields": ["name"]}), None)
            .await
            .unwrap();
        assert_eq!(found, json!({"id": "p9", "name": "name-p9"}));

        let missing = h
            .broker
            .call("people.lookup", json!({"id": "ghost"}), None)
            .await
            .unwrap();
        assert_eq!(missing, Value::Null);
    }

    #[test]
    fn projection_always_keeps_id() {
        let doc = json!({"id": "a", "x": 1, "y": 2});
        assert_eq!(project(doc.clone(), &["y"]), json!({"id": "a", "y": 2}));
        assert_eq!(project(doc.clone(), &[] as &[&str]), doc);
    }
}
