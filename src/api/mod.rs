// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # HTTP Gateway
//!
//! Thin axum routes under `/api`. Each handler forwards to exactly one
//! broker action through [`Broker::request`](crate::broker::Broker::request),
//! so internal actions are unreachable from here. The authentication filter
//! runs over every `/api` route.

use axum::{
    body::Body,
    http::{HeaderName, Request},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::authenticate, CallerIdentity},
    error::ServiceError,
    models::{
        AddCommentRequest, Article, ArticleChanges, ArticleResponse, ArticlesResponse, Comment,
        CommentResponse, CommentsResponse, CreateArticleRequest, LoginRequest, LoginUser,
        NewArticle, NewComment, NewUser, Profile, ProfileResponse, RegisterRequest, TagsResponse,
        UpdateArticleRequest, UpdateUserRequest, User, UserChanges, UserResponse,
    },
    state::AppState,
};

pub mod articles;
pub mod comments;
pub mod extract;
pub mod health;
pub mod profiles;
pub mod tags;
pub mod users;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/users", post(users::register))
        .route("/users/login", post(users::login))
        .route("/user", get(users::current_user).put(users::update_user))
        .route("/profiles/{username}", get(profiles::get_profile))
        .route(
            "/profiles/{username}/follow",
            post(profiles::follow).delete(profiles::unfollow),
        )
        .route(
            "/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route("/articles/feed", get(articles::feed))
        .route(
            "/articles/{slug}",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route(
            "/articles/{slug}/favorite",
            post(articles::favorite).delete(articles::unfavorite),
        )
        .route(
            "/articles/{slug}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/articles/{slug}/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/tags", get(tags::list_tags))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .layer(CorsLayer::permissive())
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}

/// Run a public or authenticated action and shape its result as `T`.
pub(crate) async fn forward<T: DeserializeOwned>(
    state: &AppState,
    action: &str,
    params: Value,
    caller: Option<CallerIdentity>,
) -> Result<Json<T>, ServiceError> {
    let result = state.broker.request(action, params, caller).await?;
    Ok(Json(serde_json::from_value(result)?))
}

/// Registers the `Authorization: Token <jwt>` scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "`Token <jwt>` as returned by POST /api/users or /api/users/login.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        users::register,
        users::login,
        users::current_user,
        users::update_user,
        profiles::get_profile,
        profiles::follow,
        profiles::unfollow,
        articles::list_articles,
        articles::feed,
        articles::get_article,
        articles::create_article,
        articles::update_article,
        articles::delete_article,
        articles::favorite,
        articles::unfavorite,
        comments::list_comments,
        comments::add_comment,
        comments::update_comment,
        comments::delete_comment,
        tags::list_tags,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            NewUser,
            RegisterRequest,
            LoginUser,
            LoginRequest,
            UserChanges,
            UpdateUserRequest,
            User,
            UserResponse,
            Profile,
            ProfileResponse,
            Article,
            ArticleResponse,
            ArticlesResponse,
            NewArticle,
            CreateArticleRequest,
            ArticleChanges,
            UpdateArticleRequest,
            Comment,
            CommentResponse,
            CommentsResponse,
            NewComment,
            AddCommentRequest,
            TagsResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Users", description = "Registration, login and the current account"),
        (name = "Profiles", description = "Public profiles and following"),
        (name = "Articles", description = "Articles, feed and favorites"),
        (name = "Comments", description = "Article comments"),
        (name = "Tags", description = "Tag listing"),
        (name = "Health", description = "Liveness and readiness checks")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;
    use axum::{
        body::to_bytes,
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Method, StatusCode,
        },
    };
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(test_support::broker(), None))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Token {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn signup(app: &Router, name: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({"user": {
                "username": name,
                "email": format!("{name}@x.io"),
                "password": "secret1",
            }})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["user"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_login_and_fetch_current_user() {
        let app = app();
        signup(&app, "jane").await;

        let (status, login) = send(
            &app,
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"user": {"email": "jane@x.io", "password": "secret1"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = login["user"]["token"].as_str().unwrap();

        let (status, me) = send(&app, Method::GET, "/api/user", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user"]["username"], "jane");
        assert!(me["user"].get("password").is_none());

        let (status, updated) = send(
            &app,
            Method::PUT,
            "/api/user",
            Some(token),
            Some(json!({"user": {"bio": "writer"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["user"]["bio"], "writer");
    }

    #[tokio::test]
    async fn wrong_password_is_unprocessable() {
        let app = app();
        signup(&app, "jane").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"user": {"email": "jane@x.io", "password": "nope-nope"}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn registration_keeps_bio_and_image() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({"user": {
                "username": "jane",
                "email": "jane@x.io",
                "password": "secret1",
                "bio": "hi",
                "image": "https://i/j.png",
            }})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["user"]["bio"], "hi");
        assert_eq!(body["user"]["image"], "https://i/j.png");

        let (_, profile) = send(&app, Method::GET, "/api/profiles/jane", None, None).await;
        assert_eq!(profile["profile"]["bio"], "hi");
        assert_eq!(profile["profile"]["image"], "https://i/j.png");
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(json!({"user": {"username": "jane"}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert!(body["error"].as_str().unwrap().contains("email"), "{body}");
    }

    #[tokio::test]
    async fn malformed_query_is_a_validation_error() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/articles?limit=abc", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn authenticated_routes_require_a_caller() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/user", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "UNAUTHORIZED");

        let (status, _) = send(&app, Method::GET, "/api/articles/feed", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_token_fails_even_on_public_routes() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/api/tags", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "INVALID_TOKEN");

        let (status, body) = send(&app, Method::GET, "/api/tags", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"tags": []}));
    }

    #[tokio::test]
    async fn article_favorite_and_comment_flow() {
        let app = app();
        let jane = signup(&app, "jane").await;
        let bob = signup(&app, "bob").await;

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/articles",
            Some(&jane),
            Some(json!({"article": {
                "title": "Hello World",
                "description": "d",
                "body": "b",
                "tagList": ["x"],
            }})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let slug = created["article"]["slug"].as_str().unwrap().to_string();

        let (status, fetched) =
            send(&app, Method::GET, &format!("/api/articles/{slug}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["article"]["favorited"], false);
        assert_eq!(fetched["article"]["favoritesCount"], 0);
        assert_eq!(fetched["article"]["author"]["username"], "jane");

        let (status, favorited) = send(
            &app,
            Method::POST,
            &format!("/api/articles/{slug}/favorite"),
            Some(&bob),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(favorited["article"]["favorited"], true);
        assert_eq!(favorited["article"]["favoritesCount"], 1);

        let (_, listed) = send(&app, Method::GET, "/api/articles?favorited=bob", None, None).await;
        assert_eq!(listed["articlesCount"], 1);

        let (status, comment) = send(
            &app,
            Method::POST,
            &format!("/api/articles/{slug}/comments"),
            Some(&bob),
            Some(json!({"comment": {"body": "nice"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let comment_id = comment["comment"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/articles/{slug}/comments/{comment_id}"),
            Some(&jane),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) =
            send(&app, Method::DELETE, &format!("/api/articles/{slug}"), Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) =
            send(&app, Method::DELETE, &format!("/api/articles/{slug}"), Some(&jane), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) =
            send(&app, Method::GET, &format!("/api/articles/{slug}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error_code"], "ARTICLE_NOT_FOUND");
    }

    #[tokio::test]
    async fn profiles_follow_and_feed() {
        let app = app();
        let jane = signup(&app, "jane").await;
        let bob = signup(&app, "bob").await;
        send(
            &app,
            Method::POST,
            "/api/articles",
            Some(&jane),
            Some(json!({"article": {"title": "By jane", "description": "d", "body": "b"}})),
        )
        .await;

        let (status, profile) =
            send(&app, Method::POST, "/api/profiles/jane/follow", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["profile"]["following"], true);

        let (_, feed) = send(&app, Method::GET, "/api/articles/feed", Some(&bob), None).await;
        assert_eq!(feed["articlesCount"], 1);
        assert_eq!(feed["articles"][0]["author"]["following"], true);

        let (status, profile) =
            send(&app, Method::DELETE, "/api/profiles/jane/follow", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["profile"]["following"], false);

        let (status, _) = send(&app, Method::GET, "/api/profiles/nobody", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_storage_and_sets_request_id() {
        let app = app();
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["checks"]["storage"], "ok");
        assert!(body["checks"].get("data_dir").is_none());
    }

    #[test]
    fn openapi_document_lists_routes() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for path in ["/api/users", "/api/articles/{slug}", "/api/tags", "/health"] {
            assert!(doc["paths"].get(path).is_some(), "{path}");
        }
        assert!(doc["components"]["securitySchemes"].get("token").is_some());
    }
}
