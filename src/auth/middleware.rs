// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway authentication filter.
//!
//! Runs over every route:
//!
//! 1. Reads `Authorization: Token <jwt>` or `Authorization: Bearer <jwt>`
//! 2. No header (or an unknown scheme) → request proceeds anonymously
//! 3. Otherwise resolves the token through `users.resolveToken`
//!    - success → [`CallerIdentity`] inserted into request extensions
//!    - failure → 401 before the handler runs
//!
//! Whether an action needs a caller is decided by the broker, not here.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use super::CallerIdentity;
use crate::broker::Broker;
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;

/// Schemes accepted in the `Authorization` header.
const SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// Authentication middleware function.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = credential(request.headers()) else {
        return next.run(request).await;
    };

    match resolve_caller(&state.broker, token).await {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "bearer credential rejected");
            e.into_response()
        }
    }
}

/// Token from the `Authorization` header, if it uses a known scheme.
pub fn credential(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    if SCHEMES.contains(&scheme) && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

async fn resolve_caller(broker: &Broker, token: String) -> ServiceResult<CallerIdentity> {
    let identity = broker
        .call("users.resolveToken", json!({ "token": token }), None)
        .await?;
    if identity.is_null() {
        return Err(ServiceError::IdentityNotFound);
    }
    Ok(serde_json::from_value(identity)?)
}
