// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the Conduit API.
//!
//! ## Auth Flow
//!
//! 1. `users.create` / `users.login` issue an HS256 token carrying
//!    `{id, username, exp}` (60 days by default)
//! 2. Clients send `Authorization: Token <jwt>` (or `Bearer <jwt>`)
//! 3. The gateway middleware resolves the token through `users.resolveToken`
//!    and attaches a [`CallerIdentity`] to the request
//! 4. Handlers forward that identity into every broker call
//!
//! ## Security
//!
//! - Expiry is checked exactly, without leeway
//! - Passwords are hashed with argon2 on the blocking pool
//! - The caller identity never carries the credential hash

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod token;

pub use claims::{CallerIdentity, TokenClaims};
pub use error::TokenError;
pub use extractor::Caller;
pub use token::TokenIssuer;
