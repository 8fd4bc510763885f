// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Body and query extractors whose rejections render as [`ServiceError`].

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ServiceError;

/// `Json<T>` that fails with a `VALIDATION_ERROR` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct ApiJson<T>(pub T);

/// `Query<T>` that fails with a `VALIDATION_ERROR` envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct ApiQuery<T>(pub T);
