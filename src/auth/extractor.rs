// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the request's caller.
//!
//! ```rust,ignore
//! async fn get_article(Caller(caller): Caller, ...) -> ... {
//!     // caller: Option<CallerIdentity>, set by the auth middleware
//! }
//! ```

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::CallerIdentity;

/// Identity the auth middleware attached, if any.
///
/// Never rejects: enforcing authentication is the broker's job.
pub struct Caller(pub Option<CallerIdentity>);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller(parts.extensions.get::<CallerIdentity>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts() -> Parts {
        Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn caller_is_none_without_middleware_identity() {
        let mut parts = parts();
        let Caller(caller) = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(caller.is_none());
    }

    #[tokio::test]
    async fn caller_reads_extensions() {
        let mut parts = parts();
        parts.extensions.insert(CallerIdentity {
            id: "u1".into(),
            username: "jane".into(),
            email: "jane@x.io".into(),
            image: None,
        });

        let Caller(caller) = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller.unwrap().username, "jane");
    }
}
