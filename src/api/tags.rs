// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde_json::Value;

use super::forward;
use crate::error::ServiceError;
use crate::models::TagsResponse;
use crate::state::AppState;

/// Every tag used by at least one article, sorted.
#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "Tags",
    responses((status = 200, description = "Tag set", body = TagsResponse))
)]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, ServiceError> {
    forward(&state, "articles.tags", Value::Null, None).await
}
