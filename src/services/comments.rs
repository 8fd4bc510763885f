// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `comments`: comment records, keyed by article id.
//!
//! Callers outside `articles` rarely reach this service directly; the
//! article comment actions resolve the slug first and delegate here.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::transform;
use crate::broker::{parse_params, ActionDef, Context, Service};
use crate::error::{ServiceError, ServiceResult};
use crate::populate::{self, LookupParams, Relation, Relations};
use crate::storage::records::new_id;
use crate::storage::{CommentRecord, Filter, FindQuery, Repository};

const ACTIONS: &[ActionDef] = &[
    ActionDef::public("list"),
    ActionDef::authenticated("create"),
    ActionDef::authenticated("update"),
    ActionDef::authenticated("remove"),
    ActionDef::internal("removeByArticle"),
    ActionDef::internal("lookup"),
];

const RELATIONS: Relations = Relations(&[
    Relation::new("author", "users.lookup").fields(&["username", "bio", "image"]),
    Relation::new("article", "articles.lookup")
        .fields(&["slug", "title", "author"])
        .populate(&["author"]),
]);

#[derive(Deserialize)]
struct ArticleParams {
    article: String,
}

#[derive(Deserialize)]
struct CommentBody {
    body: String,
}

#[derive(Deserialize)]
struct CreateParams {
    article: String,
    comment: CommentBody,
}

#[derive(Deserialize)]
struct UpdateParams {
    article: String,
    #[serde(rename = "commentID")]
    comment_id: String,
    comment: CommentBody,
}

#[derive(Deserialize)]
struct RemoveParams {
    article: String,
    #[serde(rename = "commentID")]
    comment_id: String,
}

pub struct CommentsService {
    repo: Box<dyn Repository<CommentRecord>>,
}

impl CommentsService {
    pub fn new(repo: impl Repository<CommentRecord> + 'static) -> Self {
        Self {
            repo: Box::new(repo),
        }
    }

    async fn list(&self, p: ArticleParams, ctx: &Context) -> ServiceResult<Value> {
        let query = FindQuery::new()
            .filter(Filter::eq("article", p.article))
            .sort_desc("createdAt");
        let comments = self.repo.find(query).await?;
        Ok(json!({ "comments": self.render(ctx, comments).await? }))
    }

    async fn create(&self, p: CreateParams, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let body = required_body(p.comment)?;
        let now = Utc::now();

        let comment = self
            .repo
            .insert(CommentRecord {
                id: new_id(),
                article: p.article,
                author: caller.id.clone(),
                body,
                created_at: now,
                updated_at: now,
            })
            .await?;
        self.render_one(ctx, comment).await
    }

    async fn update(&self, p: UpdateParams, ctx: &Context) -> ServiceResult<Value> {
        self.owned(&p.article, &p.comment_id, ctx).await?;
        let body = required_body(p.comment)?;

        let comment = self
            .repo
            .update_by_id(
                &p.comment_id,
                json!({ "body": body, "updatedAt": Utc::now() }),
            )
            .await?;
        self.render_one(ctx, comment).await
    }

    async fn remove(&self, p: RemoveParams, ctx: &Context) -> ServiceResult<Value> {
        self.owned(&p.article, &p.comment_id, ctx).await?;
        let removed = self.repo.remove_by_id(&p.comment_id).await?;
        self.render_one(ctx, removed).await
    }

    async fn remove_by_article(&self, p: ArticleParams) -> ServiceResult<Value> {
        let query = FindQuery::new().filter(Filter::eq("article", p.article));
        Ok(json!(self.repo.remove_where(query).await?))
    }

    async fn lookup(&self, p: LookupParams, ctx: &Context) -> ServiceResult<Value> {
        let docs = self
            .repo
            .get_many(&p.ids())
            .await?
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        populate::lookup(ctx, &p, docs, &RELATIONS).await
    }

    /// The comment, if it belongs to `article` and to the caller.
    async fn owned(
        &self,
        article: &str,
        comment_id: &str,
        ctx: &Context,
    ) -> ServiceResult<CommentRecord> {
        let caller = ctx.require_caller()?;
        let comment = self
            .repo
            .get(comment_id)
            .await?
            .filter(|c| c.article == article)
            .ok_or(ServiceError::CommentNotFound)?;
        if comment.author != caller.id {
            return Err(ServiceError::forbidden("Only the author can change this comment"));
        }
        Ok(comment)
    }

    async fn render(
        &self,
        ctx: &Context,
        comments: Vec<CommentRecord>,
    ) -> ServiceResult<Vec<Value>> {
        let mut docs = comments
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        populate::populate(ctx, &mut docs, &RELATIONS, &["author"]).await?;
        transform::comments(ctx, docs).await
    }

    async fn render_one(&self, ctx: &Context, comment: CommentRecord) -> ServiceResult<Value> {
        let mut rendered = self.render(ctx, vec![comment]).await?;
        Ok(json!({ "comment": rendered.pop().unwrap_or(Value::Null) }))
    }
}

fn required_body(comment: CommentBody) -> ServiceResult<String> {
    if comment.body.trim().is_empty() {
        return Err(ServiceError::validation("Comment body must not be empty"));
    }
    Ok(comment.body)
}

#[async_trait]
impl Service for CommentsService {
    fn name(&self) -> &'static str {
        "comments"
    }

    fn actions(&self) -> &'static [ActionDef] {
        ACTIONS
    }

    async fn call(&self, action: &str, params: Value, ctx: &Context) -> ServiceResult<Value> {
        match action {
            "list" => self.list(parse_params(params)?, ctx).await,
            "create" => self.create(parse_params(params)?, ctx).await,
            "update" => self.update(parse_params(params)?, ctx).await,
            "remove" => self.remove(parse_params(params)?, ctx).await,
            "removeByArticle" => self.remove_by_article(parse_params(params)?).await,
            "lookup" => self.lookup(parse_params(params)?, ctx).await,
            other => Err(ServiceError::ServiceNotFound(format!("comments.{other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{broker, register};

    #[tokio::test]
    async fn comment_lifecycle_checks_ownership() {
        let broker = broker();
        let (jane, _) = register(&broker, "jane").await;
        let (bob, _) = register(&broker, "bob").await;

        let created = broker
            .call(
                "comments.create",
                json!({"article": "a1", "comment": {"body": "first!"}}),
                Some(jane.clone()),
            )
            .await
            .unwrap();
        let comment = &created["comment"];
        let comment_id = comment["id"].as_str().unwrap().to_string();
        assert_eq!(comment["body"], "first!");
        assert_eq!(comment["author"]["username"], "jane");
        assert!(comment.get("article").is_none());
        assert!(comment["author"].get("id").is_none());

        let err = broker
            .call(
                "comments.update",
                json!({"article": "a1", "commentID": comment_id, "comment": {"body": "x"}}),
                Some(bob.clone()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = broker
            .call(
                "comments.remove",
                json!({"article": "other", "commentID": comment_id}),
                Some(jane.clone()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CommentNotFound));

        let updated = broker
            .call(
                "comments.update",
                json!({"article": "a1", "commentID": comment_id, "comment": {"body": "edited"}}),
                Some(jane.clone()),
            )
            .await
            .unwrap();
        assert_eq!(updated["comment"]["body"], "edited");

        broker
            .call(
                "comments.remove",
                json!({"article": "a1", "commentID": comment_id}),
                Some(jane),
            )
            .await
            .unwrap();
        let listed = broker
            .call("comments.list", json!({"article": "a1"}), None)
            .await
            .unwrap();
        assert_eq!(listed, json!({"comments": []}));
    }

    #[tokio::test]
    async fn list_shows_viewer_relative_following() {
        let broker = broker();
        let (jane, _) = register(&broker, "jane").await;
        let (bob, _) = register(&broker, "bob").await;

        broker
            .call(
                "comments.create",
                json!({"article": "a1", "comment": {"body": "hi"}}),
                Some(jane.clone()),
            )
            .await
            .unwrap();
        broker
            .call("users.follow", json!({"username": "jane"}), Some(bob.clone()))
            .await
            .unwrap();

        let as_bob = broker
            .call("comments.list", json!({"article": "a1"}), Some(bob))
            .await
            .unwrap();
        assert_eq!(as_bob["comments"][0]["author"]["following"], true);

        let anon = broker
            .call("comments.list", json!({"article": "a1"}), None)
            .await
            .unwrap();
        assert_eq!(anon["comments"][0]["author"]["following"], false);
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let broker = broker();
        let (jane, _) = register(&broker, "jane").await;
        let err = broker
            .call(
                "comments.create",
                json!({"article": "a1", "comment": {"body": "  "}}),
                Some(jane),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
