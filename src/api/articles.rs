// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Article endpoints. Every handler maps onto one `articles.*` action.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use super::extract::{ApiJson, ApiQuery};
use super::forward;
use crate::auth::Caller;
use crate::error::ServiceError;
use crate::models::{
    ArticleResponse, ArticlesResponse, CreateArticleRequest, FeedQuery, ListArticlesQuery,
    UpdateArticleRequest,
};
use crate::state::AppState;

/// List articles, newest first.
#[utoipa::path(
    get,
    path = "/api/articles",
    tag = "Articles",
    params(ListArticlesQuery),
    responses(
        (status = 200, description = "One page of articles", body = ArticlesResponse),
        (status = 404, description = "Author not found")
    )
)]
pub async fn list_articles(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiQuery(query): ApiQuery<ListArticlesQuery>,
) -> Result<Json<ArticlesResponse>, ServiceError> {
    forward(&state, "articles.list", serde_json::to_value(query)?, caller).await
}

/// Articles by authors the caller follows.
#[utoipa::path(
    get,
    path = "/api/articles/feed",
    tag = "Articles",
    security(("token" = [])),
    params(FeedQuery),
    responses(
        (status = 200, description = "One page of the feed", body = ArticlesResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn feed(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> Result<Json<ArticlesResponse>, ServiceError> {
    forward(&state, "articles.feed", serde_json::to_value(query)?, caller).await
}

#[utoipa::path(
    get,
    path = "/api/articles/{slug}",
    tag = "Articles",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Article", body = ArticleResponse),
        (status = 404, description = "Article not found")
    )
)]
pub async fn get_article(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(slug): Path<String>,
) -> Result<Json<ArticleResponse>, ServiceError> {
    forward(&state, "articles.get", json!({ "slug": slug }), caller).await
}

#[utoipa::path(
    post,
    path = "/api/articles",
    tag = "Articles",
    security(("token" = [])),
    request_body = CreateArticleRequest,
    responses(
        (status = 200, description = "Created article", body = ArticleResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_article(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(body): ApiJson<CreateArticleRequest>,
) -> Result<Json<ArticleResponse>, ServiceError> {
    forward(&state, "articles.create", serde_json::to_value(body)?, caller).await
}

#[utoipa::path(
    put,
    path = "/api/articles/{slug}",
    tag = "Articles",
    security(("token" = [])),
    params(("slug" = String, Path, description = "Article slug")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated article", body = ArticleResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn update_article(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(slug): Path<String>,
    ApiJson(body): ApiJson<UpdateArticleRequest>,
) -> Result<Json<ArticleResponse>, ServiceError> {
    let params = json!({ "slug": slug, "article": body.article });
    forward(&state, "articles.update", params, caller).await
}

/// Delete an article along with its favorites and comments.
#[utoipa::path(
    delete,
    path = "/api/articles/{slug}",
    tag = "Articles",
    security(("token" = [])),
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "The removed article", body = ArticleResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn delete_article(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(slug): Path<String>,
) -> Result<Json<ArticleResponse>, ServiceError> {
    forward(&state, "articles.remove", json!({ "slug": slug }), caller).await
}

#[utoipa::path(
    post,
    path = "/api/articles/{slug}/favorite",
    tag = "Articles",
    security(("token" = [])),
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Favorited article", body = ArticleResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Article not found"),
        (status = 409, description = "Already favorited")
    )
)]
pub async fn favorite(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(slug): Path<String>,
) -> Result<Json<ArticleResponse>, ServiceError> {
    forward(&state, "articles.favorite", json!({ "slug": slug }), caller).await
}

#[utoipa::path(
    delete,
    path = "/api/articles/{slug}/favorite",
    tag = "Articles",
    security(("token" = [])),
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Unfavorited article", body = ArticleResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Article not found or not favorited")
    )
)]
pub async fn unfavorite(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(slug): Path<String>,
) -> Result<Json<ArticleResponse>, ServiceError> {
    forward(&state, "articles.unfavorite", json!({ "slug": slug }), caller).await
}
