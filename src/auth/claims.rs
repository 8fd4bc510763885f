// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the caller identity attached to each request.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims embedded in a Conduit bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Identity id.
    pub id: String,

    pub username: String,

    /// Absolute expiry (Unix seconds).
    pub exp: i64,
}

/// Authenticated caller, reduced to fields safe to pass around.
///
/// This is the only identity representation that travels through
/// [`Context`](crate::broker::Context); it has no room for a credential hash.
/// Deserializing a full user document into it drops every other field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CallerIdentity {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
}
