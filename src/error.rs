// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-visible error taxonomy shared by every service action.
//!
//! Errors raised deep inside a nested broker call propagate unchanged to the
//! gateway, which renders them as `{"error": ..., "error_code": ...}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::TokenError;
use crate::storage::StorageError;

/// Taxonomy class of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Forbidden,
    Unauthorized,
    Infrastructure,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Email or password is invalid")]
    InvalidCredentials,

    #[error("Article not found")]
    ArticleNotFound,

    #[error("Comment not found")]
    CommentNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Author not found")]
    AuthorNotFound,

    #[error("Article is not favorited")]
    NotFavorited,

    #[error("User is not followed")]
    NotFollowed,

    #[error("Article is already favorited")]
    AlreadyFavorited,

    #[error("User is already followed")]
    AlreadyFollowed,

    #[error("Username is already taken")]
    UsernameTaken,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("{0} already exists")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Authentication is required")]
    Unauthorized,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Token identity no longer exists")]
    IdentityNotFound,

    #[error("Service action not found: {0}")]
    ServiceNotFound(String),

    #[error("Maximum call level {0} exceeded")]
    MaxCallLevel(u32),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidCredentials => ErrorKind::Validation,
            ServiceError::ArticleNotFound
            | ServiceError::CommentNotFound
            | ServiceError::UserNotFound
            | ServiceError::AuthorNotFound
            | ServiceError::NotFavorited
            | ServiceError::NotFollowed => ErrorKind::NotFound,
            ServiceError::AlreadyFavorited
            | ServiceError::AlreadyFollowed
            | ServiceError::UsernameTaken
            | ServiceError::EmailTaken
            | ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::Unauthorized
            | ServiceError::InvalidToken(_)
            | ServiceError::IdentityNotFound => ErrorKind::Unauthorized,
            ServiceError::ServiceNotFound(_)
            | ServiceError::MaxCallLevel(_)
            | ServiceError::Storage(_)
            | ServiceError::Internal(_) => ErrorKind::Infrastructure,
        }
    }

    /// Stable error code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::InvalidCredentials => "INVALID_CREDENTIALS",
            ServiceError::ArticleNotFound => "ARTICLE_NOT_FOUND",
            ServiceError::CommentNotFound => "COMMENT_NOT_FOUND",
            ServiceError::UserNotFound => "USER_NOT_FOUND",
            ServiceError::AuthorNotFound => "AUTHOR_NOT_FOUND",
            ServiceError::NotFavorited => "NOT_FAVORITED",
            ServiceError::NotFollowed => "NOT_FOLLOWED",
            ServiceError::AlreadyFavorited => "ALREADY_FAVORITED",
            ServiceError::AlreadyFollowed => "ALREADY_FOLLOWED",
            ServiceError::UsernameTaken => "USERNAME_TAKEN",
            ServiceError::EmailTaken => "EMAIL_TAKEN",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::Unauthorized => "UNAUTHORIZED",
            ServiceError::InvalidToken(_) => "INVALID_TOKEN",
            ServiceError::IdentityNotFound => "IDENTITY_NOT_FOUND",
            ServiceError::ServiceNotFound(_) => "SERVICE_NOT_FOUND",
            ServiceError::MaxCallLevel(_) => "MAX_CALL_LEVEL",
            ServiceError::Storage(_) => "STORAGE_ERROR",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Infrastructure => match self {
                ServiceError::ServiceNotFound(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Duplicate { field } => ServiceError::Conflict(field.to_string()),
            other => ServiceError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Internal(format!("serialization: {e}"))
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::Validation(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if self.kind() == ErrorKind::Infrastructure {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        let status = self.status();
        let body = Json(ErrorBody {
            error: self.to_string(),
            error_code: self.code(),
        });
        (status, body).into_response()
    }
}
