// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use super::forward;
use crate::auth::Caller;
use crate::error::ServiceError;
use crate::models::ProfileResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/profiles/{username}",
    tag = "Profiles",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Profile, relative to the caller", body = ProfileResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ServiceError> {
    forward(&state, "users.profile", json!({ "username": username }), caller).await
}

#[utoipa::path(
    post,
    path = "/api/profiles/{username}/follow",
    tag = "Profiles",
    security(("token" = [])),
    params(("username" = String, Path, description = "Username to follow")),
    responses(
        (status = 200, description = "Now following", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already following")
    )
)]
pub async fn follow(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ServiceError> {
    forward(&state, "users.follow", json!({ "username": username }), caller).await
}

#[utoipa::path(
    delete,
    path = "/api/profiles/{username}/follow",
    tag = "Profiles",
    security(("token" = [])),
    params(("username" = String, Path, description = "Username to unfollow")),
    responses(
        (status = 200, description = "No longer following", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found or not followed")
    )
)]
pub async fn unfollow(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ServiceError> {
    forward(&state, "users.unfollow", json!({ "username": username }), caller).await
}
