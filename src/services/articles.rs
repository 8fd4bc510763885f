// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `articles`: article records plus the list/feed/detail composition.
//!
//! Articles store only their author's id. Every read resolves the author
//! through `users.lookup`, then asks the ledgers for `favorited`,
//! `favoritesCount` and `following`. Comment actions resolve the slug here
//! and delegate to `comments`.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::try_join;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::transform;
use crate::broker::{parse_params, ActionDef, Context, Service};
use crate::error::{ServiceError, ServiceResult};
use crate::populate::{self, LookupParams, Relation, Relations};
use crate::storage::records::new_id;
use crate::storage::{ArticleRecord, Filter, FindQuery, Repository, StorageError};

pub const DEFAULT_LIMIT: usize = 20;

const SLUG_SUFFIX_LEN: usize = 6;
const SLUG_ATTEMPTS: usize = 5;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

const ACTIONS: &[ActionDef] = &[
    ActionDef::public("list"),
    ActionDef::authenticated("feed"),
    ActionDef::public("get"),
    ActionDef::authenticated("create"),
    ActionDef::authenticated("update"),
    ActionDef::authenticated("remove"),
    ActionDef::authenticated("favorite"),
    ActionDef::authenticated("unfavorite"),
    ActionDef::public("tags"),
    ActionDef::public("comments"),
    ActionDef::authenticated("addComment"),
    ActionDef::authenticated("updateComment"),
    ActionDef::authenticated("removeComment"),
    ActionDef::internal("lookup"),
];

const RELATIONS: Relations = Relations(&[
    Relation::new("author", "users.lookup").fields(&["username", "bio", "image"]),
]);

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    favorited: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

#[derive(Deserialize)]
struct FeedParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

#[derive(Deserialize)]
struct SlugParams {
    slug: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewArticle {
    title: String,
    description: String,
    body: String,
    #[serde(default)]
    tag_list: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct CreateParams {
    article: NewArticle,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ArticleChanges {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    tag_list: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct UpdateParams {
    slug: String,
    #[serde(default)]
    article: ArticleChanges,
}

#[derive(Deserialize)]
struct AddCommentParams {
    slug: String,
    comment: Value,
}

#[derive(Deserialize)]
struct UpdateCommentParams {
    slug: String,
    #[serde(rename = "commentID")]
    comment_id: String,
    comment: Value,
}

#[derive(Deserialize)]
struct RemoveCommentParams {
    slug: String,
    #[serde(rename = "commentID")]
    comment_id: String,
}

pub struct ArticlesService {
    repo: Box<dyn Repository<ArticleRecord>>,
}

impl ArticlesService {
    pub fn new(repo: impl Repository<ArticleRecord> + 'static) -> Self {
        Self {
            repo: Box::new(repo),
        }
    }

    async fn list(&self, p: ListParams, ctx: &Context) -> ServiceResult<Value> {
        let mut query = FindQuery::new();

        if let Some(tag) = non_empty(p.tag) {
            query = query.filter(Filter::contains("tagList", tag));
        }
        if let Some(author) = non_empty(p.author) {
            let author_id = user_id(ctx, &author)
                .await?
                .ok_or(ServiceError::AuthorNotFound)?;
            query = query.filter(Filter::eq("author", author_id));
        }
        if let Some(username) = non_empty(p.favorited) {
            let Some(user) = user_id(ctx, &username).await? else {
                return Ok(empty_page());
            };
            let favorited: Vec<String> = ctx
                .call_as("favorites.articles", json!({ "user": user }))
                .await?;
            query = query.filter(Filter::one_of("id", favorited));
        }

        self.page(ctx, query, p.limit, p.offset).await
    }

    async fn feed(&self, p: FeedParams, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let followees: Vec<String> = ctx
            .call_as("follows.followees", json!({ "user": caller.id }))
            .await?;

        let mut seen = HashSet::new();
        let authors: Vec<String> = followees
            .into_iter()
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        if authors.is_empty() {
            return Ok(empty_page());
        }

        let query = FindQuery::new().filter(Filter::one_of("author", authors));
        self.page(ctx, query, p.limit, p.offset).await
    }

    async fn get(&self, p: SlugParams, ctx: &Context) -> ServiceResult<Value> {
        let article = self.by_slug(&p.slug).await?;
        self.render_one(ctx, article).await
    }

    async fn create(&self, p: CreateParams, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let NewArticle {
            title,
            description,
            body,
            tag_list,
        } = p.article;
        require_text("title", &title)?;
        require_text("description", &description)?;
        require_text("body", &body)?;
        let tag_list = normalize_tags(tag_list.unwrap_or_default());
        let now = Utc::now();

        for attempt in 1..=SLUG_ATTEMPTS {
            let record = ArticleRecord {
                id: new_id(),
                slug: make_slug(&title),
                title: title.clone(),
                description: description.clone(),
                body: body.clone(),
                tag_list: tag_list.clone(),
                author: caller.id.clone(),
                created_at: now,
                updated_at: now,
            };
            match self.repo.insert(record).await {
                Ok(article) => {
                    info!(slug = %article.slug, author = %article.author, "article created");
                    return self.render_one(ctx, article).await;
                }
                Err(StorageError::Duplicate { field: "slug" }) => {
                    debug!(attempt, "slug collision, retrying with a fresh suffix");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict("slug".to_string()))
    }

    async fn update(&self, p: UpdateParams, ctx: &Context) -> ServiceResult<Value> {
        let article = self.owned(&p.slug, ctx).await?;
        let changes = p.article;
        let mut patch = Map::new();

        for (field, value) in [
            ("title", changes.title),
            ("description", changes.description),
            ("body", changes.body),
        ] {
            if let Some(value) = value {
                require_text(field, &value)?;
                patch.insert(field.to_string(), json!(value));
            }
        }
        if let Some(tags) = changes.tag_list {
            patch.insert("tagList".into(), json!(normalize_tags(tags)));
        }
        patch.insert("updatedAt".into(), json!(Utc::now()));

        let updated = self
            .repo
            .update_by_id(&article.id, Value::Object(patch))
            .await?;
        self.render_one(ctx, updated).await
    }

    async fn remove(&self, p: SlugParams, ctx: &Context) -> ServiceResult<Value> {
        let article = self.owned(&p.slug, ctx).await?;
        let snapshot = self.render_one(ctx, article.clone()).await?;

        self.repo.remove_by_id(&article.id).await?;
        let cascade = json!({ "article": article.id });
        try_join!(
            ctx.call("favorites.removeByArticle", cascade.clone()),
            ctx.call("comments.removeByArticle", cascade),
        )?;
        info!(slug = %article.slug, "article removed");

        Ok(snapshot)
    }

    async fn favorite(&self, p: SlugParams, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let article = self.by_slug(&p.slug).await?;
        ctx.call(
            "favorites.add",
            json!({ "article": article.id, "user": caller.id }),
        )
        .await?;
        self.render_one(ctx, article).await
    }

    async fn unfavorite(&self, p: SlugParams, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let article = self.by_slug(&p.slug).await?;
        ctx.call(
            "favorites.delete",
            json!({ "article": article.id, "user": caller.id }),
        )
        .await?;
        self.render_one(ctx, article).await
    }

    async fn tags(&self) -> ServiceResult<Value> {
        let articles = self.repo.find(FindQuery::new()).await?;
        let tags: BTreeSet<String> = articles
            .into_iter()
            .flat_map(|article| article.tag_list)
            .collect();
        Ok(json!({ "tags": tags }))
    }

    async fn comments(&self, p: SlugParams, ctx: &Context) -> ServiceResult<Value> {
        let article = self.by_slug(&p.slug).await?;
        ctx.call("comments.list", json!({ "article": article.id }))
            .await
    }

    async fn add_comment(&self, p: AddCommentParams, ctx: &Context) -> ServiceResult<Value> {
        let article = self.by_slug(&p.slug).await?;
        ctx.call(
            "comments.create",
            json!({ "article": article.id, "comment": p.comment }),
        )
        .await
    }

    async fn update_comment(&self, p: UpdateCommentParams, ctx: &Context) -> ServiceResult<Value> {
        let article = self.by_slug(&p.slug).await?;
        ctx.call(
            "comments.update",
            json!({ "article": article.id, "commentID": p.comment_id, "comment": p.comment }),
        )
        .await
    }

    async fn remove_comment(&self, p: RemoveCommentParams, ctx: &Context) -> ServiceResult<Value> {
        let article = self.by_slug(&p.slug).await?;
        ctx.call(
            "comments.remove",
            json!({ "article": article.id, "commentID": p.comment_id }),
        )
        .await
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

    async fn by_slug(&self, slug: &str) -> ServiceResult<ArticleRecord> {
        self.repo
            .find_unique("slug", slug)
            .await?
            .ok_or(ServiceError::ArticleNotFound)
    }

    /// The article, if the caller wrote it.
    async fn owned(&self, slug: &str, ctx: &Context) -> ServiceResult<ArticleRecord> {
        let caller = ctx.require_caller()?;
        let article = self.by_slug(slug).await?;
        if article.author != caller.id {
            return Err(ServiceError::forbidden("Only the author can change this article"));
        }
        Ok(article)
    }

    async fn page(
        &self,
        ctx: &Context,
        query: FindQuery,
        limit: usize,
        offset: usize,
    ) -> ServiceResult<Value> {
        let window = query
            .clone()
            .sort_desc("createdAt")
            .limit(limit)
            .offset(offset);
        let (records, total) = try_join!(self.repo.find(window), self.repo.count(query))?;

        let articles = self.render(ctx, records).await?;
        Ok(json!({ "articles": articles, "articlesCount": total }))
    }

    async fn render(
        &self,
        ctx: &Context,
        records: Vec<ArticleRecord>,
    ) -> ServiceResult<Vec<Value>> {
        let mut docs = records
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        populate::populate(ctx, &mut docs, &RELATIONS, &["author"]).await?;
        transform::articles(ctx, docs).await
    }

    async fn render_one(&self, ctx: &Context, article: ArticleRecord) -> ServiceResult<Value> {
        let mut rendered = self.render(ctx, vec![article]).await?;
        Ok(json!({ "article": rendered.pop().unwrap_or(Value::Null) }))
    }
}

#[async_trait]
impl Service for ArticlesService {
    fn name(&self) -> &'static str {
        "articles"
    }

    fn actions(&self) -> &'static [ActionDef] {
        ACTIONS
    }

    async fn call(&self, action: &str, params: Value, ctx: &Context) -> ServiceResult<Value> {
        match action {
            "list" => self.list(parse_params(params)?, ctx).await,
            "feed" => self.feed(parse_params(params)?, ctx).await,
            "get" => self.get(parse_params(params)?, ctx).await,
            "create" => self.create(parse_params(params)?, ctx).await,
            "update" => self.update(parse_params(params)?, ctx).await,
            "remove" => self.remove(parse_params(params)?, ctx).await,
            "favorite" => self.favorite(parse_params(params)?, ctx).await,
            "unfavorite" => self.unfavorite(parse_params(params)?, ctx).await,
            "tags" => self.tags().await,
            "comments" => self.comments(parse_params(params)?, ctx).await,
            "addComment" => self.add_comment(parse_params(params)?, ctx).await,
            "updateComment" => self.update_comment(parse_params(params)?, ctx).await,
            "removeComment" => self.remove_comment(parse_params(params)?, ctx).await,
            "lookup" => self.lookup(parse_params(params)?, ctx).await,
            other => Err(ServiceError::ServiceNotFound(format!("articles.{other}"))),
        }
    }
}

async fn user_id(ctx: &Context, username: &str) -> ServiceResult<Option<String>> {
    let user = ctx
        .call("users.byUsername", json!({ "username": username }))
        .await?;
    Ok(user.get("id").and_then(Value::as_str).map(str::to_string))
}

fn empty_page() -> Value {
    json!({ "articles": [], "articlesCount": 0 })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn require_text(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("Article {field} must not be empty")));
    }
    Ok(())
}

/// Trimmed, non-empty, first occurrence wins.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

/// Lowercase ASCII words joined by `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "article".to_string()
    } else {
        slug.to_string()
    }
}

/// `slugify(title)` plus a random base-36 suffix.
fn make_slug(title: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SLUG_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}-{suffix}", slugify(title))
}
