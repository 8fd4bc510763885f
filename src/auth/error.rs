// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification errors.

use jsonwebtoken::errors::ErrorKind;

/// Why a bearer token could not be verified.
///
/// Surfaced to clients as `InvalidToken`; the variant only refines the
/// message and the log line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Token is not a well-formed JWT or its claims do not decode.
    #[error("Token is malformed")]
    Malformed,
    /// Signature does not match the shared secret.
    #[error("Token signature is invalid")]
    InvalidSignature,
    /// The embedded expiry has elapsed.
    #[error("Token has expired")]
    Expired,
    /// Token could not be signed.
    #[error("Token could not be issued: {0}")]
    Issue(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}
