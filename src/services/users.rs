// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `users`: identities, credentials, tokens and profiles.
//!
//! The stored [`IdentityRecord`] carries the password hash; nothing leaves
//! this service except through [`public_doc`], [`auth_view`] or
//! [`profile_view`], none of which include it.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::TokenIssuer;
use crate::broker::{parse_params, ActionDef, Context, Service};
use crate::error::{ServiceError, ServiceResult};
use crate::populate::{self, LookupParams, Relations};
use crate::storage::records::new_id;
use crate::storage::{IdentityRecord, Repository, StorageError};

const MIN_USERNAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 6;

const ACTIONS: &[ActionDef] = &[
    ActionDef::public("create"),
    ActionDef::public("login"),
    ActionDef::internal("resolveToken"),
    ActionDef::authenticated("me"),
    ActionDef::authenticated("updateMyself"),
    ActionDef::public("profile"),
    ActionDef::authenticated("follow"),
    ActionDef::authenticated("unfollow"),
    ActionDef::internal("byUsername"),
    ActionDef::internal("lookup"),
];

/// Users resolve no relations of their own.
const RELATIONS: Relations = Relations(&[]);

#[derive(Deserialize)]
struct CreateParams {
    username: String,
    email: String,
    password: String,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Deserialize)]
struct LoginParams {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct TokenParams {
    token: String,
}

#[derive(Deserialize)]
struct UpdateParams {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Deserialize)]
struct UsernameParams {
    username: String,
}

/// Identity fields safe to hand to other services.
pub fn public_doc(user: &IdentityRecord) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "bio": user.bio,
        "image": user.image,
    })
}

/// `{user}` envelope for the account owner, with a fresh token.
pub fn auth_view(user: &IdentityRecord, token: &str) -> Value {
    json!({
        "user": {
            "email": user.email,
            "token": token,
            "username": user.username,
            "bio": user.bio,
            "image": user.image,
        }
    })
}

pub fn profile_view(user: &IdentityRecord, following: bool) -> Value {
    json!({
        "profile": {
            "username": user.username,
            "bio": user.bio,
            "image": user.image,
            "following": following,
        }
    })
}

pub struct UsersService {
    repo: Box<dyn Repository<IdentityRecord>>,
    tokens: TokenIssuer,
}

impl UsersService {
    pub fn new(repo: impl Repository<IdentityRecord> + 'static, tokens: TokenIssuer) -> Self {
        Self {
            repo: Box::new(repo),
            tokens,
        }
    }

    async fn create(&self, p: CreateParams) -> ServiceResult<Value> {
        validate_username(&p.username)?;
        validate_email(&p.email)?;
        validate_password(&p.password)?;

        let user = IdentityRecord {
            id: new_id(),
            username: p.username.trim().to_string(),
            email: normalize_email(&p.email),
            password: hash_password(p.password).await?,
            bio: p.bio.unwrap_or_default(),
            image: p.image.filter(|i| !i.is_empty()),
            created_at: Utc::now(),
            updated_at: None,
        };
        let user = self.repo.insert(user).await.map_err(identity_conflict)?;
        info!(user_id = %user.id, username = %user.username, "user registered");

        self.with_token(&user)
    }

    async fn login(&self, p: LoginParams) -> ServiceResult<Value> {
        let user = self
            .repo
            .find_unique("email", &normalize_email(&p.email))
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(p.password, user.password.clone()).await? {
            return Err(ServiceError::InvalidCredentials);
        }
        self.with_token(&user)
    }

    async fn resolve_token(&self, p: TokenParams) -> ServiceResult<Value> {
        if p.token.trim().is_empty() {
            return Ok(Value::Null);
        }
        let claims = self.tokens.verify(&p.token)?;
        let user = self
            .repo
            .get(&claims.id)
            .await?
            .ok_or(ServiceError::IdentityNotFound)?;
        Ok(public_doc(&user))
    }

    async fn me(&self, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let user = self
            .repo
            .get(&caller.id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        self.with_token(&user)
    }

    async fn update_myself(&self, p: UpdateParams, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let mut patch = Map::new();

        if let Some(username) = p.username {
            validate_username(&username)?;
            patch.insert("username".into(), json!(username.trim()));
        }
        if let Some(email) = p.email {
            validate_email(&email)?;
            patch.insert("email".into(), json!(normalize_email(&email)));
        }
        if let Some(password) = p.password {
            validate_password(&password)?;
            patch.insert("password".into(), json!(hash_password(password).await?));
        }
        if let Some(bio) = p.bio {
            patch.insert("bio".into(), json!(bio));
        }
        if let Some(image) = p.image {
            let image = (!image.is_empty()).then_some(image);
            patch.insert("image".into(), json!(image));
        }
        patch.insert("updatedAt".into(), json!(Utc::now()));

        let user = match self.repo.update_by_id(&caller.id, Value::Object(patch)).await {
            Err(StorageError::NotFound(_)) => return Err(ServiceError::UserNotFound),
            other => other.map_err(identity_conflict)?,
        };
        self.with_token(&user)
    }

    async fn profile(&self, p: UsernameParams, ctx: &Context) -> ServiceResult<Value> {
        let user = self.by_username(&p.username).await?;
        let following = match ctx.caller() {
            Some(caller) => {
                ctx.call_as::<bool, _>(
                    "follows.has",
                    json!({ "user": caller.id, "follow": user.id }),
                )
                .await?
            }
            None => false,
        };
        Ok(profile_view(&user, following))
    }

    async fn follow(&self, p: UsernameParams, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let user = self.by_username(&p.username).await?;
        ctx.call("follows.add", json!({ "user": caller.id, "follow": user.id }))
            .await?;
        Ok(profile_view(&user, true))
    }

    async fn unfollow(&self, p: UsernameParams, ctx: &Context) -> ServiceResult<Value> {
        let caller = ctx.require_caller()?;
        let user = self.by_username(&p.username).await?;
        ctx.call("follows.delete", json!({ "user": caller.id, "follow": user.id }))
            .await?;
        Ok(profile_view(&user, false))
    }

    async fn by_username(&self, username: &str) -> ServiceResult<IdentityRecord> {
        self.repo
            .find_unique("username", username)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    async fn lookup(&self, p: LookupParams, ctx: &Context) -> ServiceResult<Value> {
        let docs = self
            .repo
            .get_many(&p.ids())
            .await?
            .iter()
            .map(public_doc)
            .collect();
        populate::lookup(ctx, &p, docs, &RELATIONS).await
    }

    fn with_token(&self, user: &IdentityRecord) -> ServiceResult<Value> {
        let token = self
            .tokens
            .issue(&user.id, &user.username)
            .map_err(|e| ServiceError::internal(e.to_string()))?;
        Ok(auth_view(user, &token))
    }
}

#[async_trait]
impl Service for UsersService {
    fn name(&self) -> &'static str {
        "users"
    }

    fn actions(&self) -> &'static [ActionDef] {
        ACTIONS
    }

    async fn call(&self, action: &str, params: Value, ctx: &Context) -> ServiceResult<Value> {
        match action {
            "create" => self.create(parse_params(params)?).await,
            "login" => self.login(parse_params(params)?).await,
            "resolveToken" => self.resolve_token(parse_params(params)?).await,
            "me" => self.me(ctx).await,
            "updateMyself" => self.update_myself(parse_params(params)?, ctx).await,
            "profile" => self.profile(parse_params(params)?, ctx).await,
            "follow" => self.follow(parse_params(params)?, ctx).await,
            "unfollow" => self.unfollow(parse_params(params)?, ctx).await,
            "byUsername" => {
                let p: UsernameParams = parse_params(params)?;
                Ok(self
                    .repo
                    .find_unique("username", &p.username)
                    .await?
                    .map(|user| public_doc(&user))
                    .unwrap_or(Value::Null))
            }
            "lookup" => self.lookup(parse_params(params)?, ctx).await,
            other => Err(ServiceError::ServiceNotFound(format!("users.{other}"))),
        }
    }
}

fn identity_conflict(e: StorageError) -> ServiceError {
    match e {
        StorageError::Duplicate { field: "username" } => ServiceError::UsernameTaken,
        StorageError::Duplicate { field: "email" } => ServiceError::EmailTaken,
        other => other.into(),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_username(username: &str) -> ServiceResult<()> {
    if username.trim().chars().count() < MIN_USERNAME_CHARS {
        return Err(ServiceError::validation(format!(
            "Username must be at least {MIN_USERNAME_CHARS} characters"
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ServiceError::validation(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

/// `local@domain.tld`, no whitespace.
fn validate_email(email: &str) -> ServiceResult<()> {
    let email = email.trim();
    let valid = !email.contains(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .rsplit_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if !valid {
        return Err(ServiceError::validation("Email is invalid"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CallerIdentity;
    use crate::services::test_support::{broker, register};

    #[test]
    fn email_shape_is_checked() {
        assert!(validate_email("jane@x.io").is_ok());
        for bad in ["jane", "@x.io", "jane@x", "jane@.io", "ja ne@x.io", "a@b@c.io", "jane@x."] {
            assert!(validate_email(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn register_login_me_scenario() {
        let broker = broker();
        let created = broker
            .call(
                "users.create",
                json!({"username": "jane", "email": "Jane@X.io", "password": "secret1"}),
                None,
            )
            .await
            .unwrap();
        assert_eq!(created["user"]["email"], "jane@x.io");
        assert_eq!(created["user"]["bio"], "");
        assert!(created["user"].get("password").is_none());

        let login = broker
            .call("users.login", json!({"email": "jane@x.io", "password": "secret1"}), None)
            .await
            .unwrap();
        let token = login["user"]["token"].as_str().unwrap().to_string();

        let identity = broker
            .call("users.resolveToken", json!({"token": token}), None)
            .await
            .unwrap();
        let caller: CallerIdentity = serde_json::from_value(identity).unwrap();

        let me = broker.call("users.me", Value::Null, Some(caller)).await.unwrap();
        assert_eq!(me["user"]["username"], "jane");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let broker = broker();
        register(&broker, "jane").await;

        for (email, password) in [("jane@x.io", "wrong-pw"), ("nobody@x.io", "secret1")] {
            let err = broker
                .call("users.login", json!({"email": email, "password": password}), None)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn duplicate_username_and_email_conflict() {
        let broker = broker();
        register(&broker, "jane").await;

        let err = broker
            .call(
                "users.create",
                json!({"username": "jane", "email": "other@x.io", "password": "secret1"}),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UsernameTaken));

        let err = broker
            .call(
                "users.create",
                json!({"username": "janet", "email": "JANE@x.io", "password": "secret1"}),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmailTaken));
    }

    #[tokio::test]
    async fn registration_validates_fields() {
        let broker = broker();
        for params in [
            json!({"username": "j", "email": "j@x.io", "password": "secret1"}),
            json!({"username": "jane", "email": "nope", "password": "secret1"}),
            json!({"username": "jane", "email": "j@x.io", "password": "short"}),
            json!({"username": "jane", "email": "j@x.io"}),
        ] {
            let err = broker.call("users.create", params, None).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn update_myself_changes_fields_and_password() {
        let broker = broker();
        let (jane, _) = register(&broker, "jane").await;
        register(&broker, "bob").await;

        let updated = broker
            .call(
                "users.updateMyself",
                json!({"bio": "hello", "image": "https://img/j.png", "password": "newsecret"}),
                Some(jane.clone()),
            )
            .await
            .unwrap();
        assert_eq!(updated["user"]["bio"], "hello");
        assert_eq!(updated["user"]["image"], "https://img/j.png");

        broker
            .call("users.login", json!({"email": "jane@x.io", "password": "newsecret"}), None)
            .await
            .unwrap();

        let err = broker
            .call("users.updateMyself", json!({"username": "bob"}), Some(jane))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UsernameTaken));
    }

    #[tokio::test]
    async fn resolve_token_edge_cases() {
        let broker = broker();
        let empty = broker
            .call("users.resolveToken", json!({"token": ""}), None)
            .await
            .unwrap();
        assert_eq!(empty, Value::Null);

        let err = broker
            .call("users.resolveToken", json!({"token": "garbage"}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken(_)));

        let orphan = TokenIssuer::new(crate::config::DEFAULT_JWT_SECRET, chrono::Duration::days(1))
            .issue("ghost-id", "ghost")
            .unwrap();
        let err = broker
            .call("users.resolveToken", json!({"token": orphan}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::IdentityNotFound));
    }

    #[tokio::test]
    async fn profile_follow_unfollow() {
        let broker = broker();
        let (jane, _) = register(&broker, "jane").await;
        register(&broker, "bob").await;

        let anon = broker
            .call("users.profile", json!({"username": "bob"}), None)
            .await
            .unwrap();
        assert_eq!(anon["profile"]["following"], false);

        let followed = broker
            .call("users.follow", json!({"username": "bob"}), Some(jane.clone()))
            .await
            .unwrap();
        assert_eq!(followed["profile"]["following"], true);

        let seen = broker
            .call("users.profile", json!({"username": "bob"}), Some(jane.clone()))
            .await
            .unwrap();
        assert_eq!(seen["profile"]["following"], true);

        let err = broker
            .call("users.follow", json!({"username": "bob"}), Some(jane.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyFollowed));

        let unfollowed = broker
            .call("users.unfollow", json!({"username": "bob"}), Some(jane.clone()))
            .await
            .unwrap();
        assert_eq!(unfollowed["profile"]["following"], false);

        let err = broker
            .call("users.profile", json!({"username": "nobody"}), Some(jane))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound));
    }

    #[tokio::test]
    async fn lookup_never_exposes_password() {
        let broker = broker();
        let (jane, _) = register(&broker, "jane").await;

        let found = broker
            .call(
                "users.lookup",
                json!({"id": [jane.id.clone(), "missing"], "fields": ["username", "password"]}),
                None,
            )
            .await
            .unwrap();
        assert_eq!(found, json!([{"id": jane.id, "username": "jane"}]));

        let by_name = broker
            .call("users.byUsername", json!({"username": "jane"}), None)
            .await
            .unwrap();
        assert!(by_name.get("password").is_none());
        assert_eq!(by_name["email"], "jane@x.io");
    }
}
