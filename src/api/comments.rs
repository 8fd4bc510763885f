// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use super::extract::ApiJson;
use super::forward;
use crate::auth::Caller;
use crate::error::ServiceError;
use crate::models::{AddCommentRequest, CommentResponse, CommentsResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/articles/{slug}/comments",
    tag = "Comments",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Comments, newest first", body = CommentsResponse),
        (status = 404, description = "Article not found")
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(slug): Path<String>,
) -> Result<Json<CommentsResponse>, ServiceError> {
    forward(&state, "articles.comments", json!({ "slug": slug }), caller).await
}

#[utoipa::path(
    post,
    path = "/api/articles/{slug}/comments",
    tag = "Comments",
    security(("token" = [])),
    params(("slug" = String, Path, description = "Article slug")),
    request_body = AddCommentRequest,
    responses(
        (status = 200, description = "Created comment", body = CommentResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn add_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(slug): Path<String>,
    ApiJson(body): ApiJson<AddCommentRequest>,
) -> Result<Json<CommentResponse>, ServiceError> {
    let params = json!({ "slug": slug, "comment": body.comment });
    forward(&state, "articles.addComment", params, caller).await
}

#[utoipa::path(
    put,
    path = "/api/articles/{slug}/comments/{id}",
    tag = "Comments",
    security(("token" = [])),
    params(
        ("slug" = String, Path, description = "Article slug"),
        ("id" = String, Path, description = "Comment ID")
    ),
    request_body = AddCommentRequest,
    responses(
        (status = 200, description = "Updated comment", body = CommentResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Article or comment not found")
    )
)]
pub async fn update_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((slug, id)): Path<(String, String)>,
    ApiJson(body): ApiJson<AddCommentRequest>,
) -> Result<Json<CommentResponse>, ServiceError> {
    let params = json!({ "slug": slug, "commentID": id, "comment": body.comment });
    forward(&state, "articles.updateComment", params, caller).await
}

#[utoipa::path(
    delete,
    path = "/api/articles/{slug}/comments/{id}",
    tag = "Comments",
    security(("token" = [])),
    params(
        ("slug" = String, Path, description = "Article slug"),
        ("id" = String, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "The removed comment", body = CommentResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Article or comment not found")
    )
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Json<CommentResponse>, ServiceError> {
    let params = json!({ "slug": slug, "commentID": id });
    forward(&state, "articles.removeComment", params, caller).await
}
