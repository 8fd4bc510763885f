// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration, login and the current account.

use axum::{extract::State, Json};
use serde_json::Value;

use super::extract::ApiJson;
use super::forward;
use crate::auth::Caller;
use crate::error::ServiceError;
use crate::models::{LoginRequest, RegisterRequest, UpdateUserRequest, UserResponse};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered; includes a token", body = UserResponse),
        (status = 409, description = "Username or email already taken"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    forward(&state, "users.create", serde_json::to_value(body.user)?, None).await
}

#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserResponse),
        (status = 422, description = "Email or password is invalid")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    forward(&state, "users.login", serde_json::to_value(body.user)?, None).await
}

#[utoipa::path(
    get,
    path = "/api/user",
    tag = "Users",
    security(("token" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn current_user(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<UserResponse>, ServiceError> {
    forward(&state, "users.me", Value::Null, caller).await
}

#[utoipa::path(
    put,
    path = "/api/user",
    tag = "Users",
    security(("token" = [])),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ServiceError> {
    forward(&state, "users.updateMyself", serde_json::to_value(body.user)?, caller).await
}
