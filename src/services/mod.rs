// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Data-owning services registered on the broker.
//!
//! | Service     | Owns                         |
//! |-------------|------------------------------|
//! | `users`     | identities, tokens, profiles |
//! | `articles`  | articles, feed, tags         |
//! | `comments`  | comments                     |
//! | `favorites` | article favorite edges       |
//! | `follows`   | follow edges                 |
//!
//! No service reads another's collection; everything crosses the broker.

pub mod articles;
pub mod comments;
pub mod favorites;
pub mod follows;
pub mod ledger;
pub mod transform;
pub mod users;

use tracing::info;

use crate::auth::TokenIssuer;
use crate::broker::Broker;
use crate::config::AppConfig;
use crate::storage::{StorageResult, Store};

use self::articles::ArticlesService;
use self::comments::CommentsService;
use self::favorites::FavoritesService;
use self::follows::FollowsService;
use self::ledger::Ledger;
use self::users::UsersService;

/// Open every collection on `store` and register the five services.
pub fn build_broker(store: &Store, config: &AppConfig) -> StorageResult<Broker> {
    let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl());

    let broker = Broker::builder()
        .max_call_level(config.max_call_level)
        .service(UsersService::new(store.collection()?, tokens))
        .service(ArticlesService::new(store.collection()?))
        .service(CommentsService::new(store.collection()?))
        .service(FavoritesService::new(Ledger::new(store.collection()?)))
        .service(FollowsService::new(Ledger::new(store.collection()?)))
        .build();
    info!(max_call_level = broker.max_call_level(), "service broker ready");

    Ok(broker)
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::json;

    use super::build_broker;
    use crate::auth::CallerIdentity;
    use crate::broker::Broker;
    use crate::config::AppConfig;
    use crate::storage::Store;

    /// Fully wired broker over an in-memory store.
    pub fn broker() -> Broker {
        let store = Store::in_memory().unwrap();
        build_broker(&store, &AppConfig::default()).unwrap()
    }

    /// Register `{name}@x.io` / `secret1` and return its identity and token.
    pub async fn register(broker: &Broker, name: &str) -> (CallerIdentity, String) {
        let created = broker
            .call(
                "users.create",
                json!({"username": name, "email": format!("{name}@x.io"), "password": "secret1"}),
                None,
            )
            .await
            .unwrap();
        let token = created["user"]["token"].as_str().unwrap().to_string();

        let identity = broker
            .call("users.resolveToken", json!({ "token": token }), None)
            .await
            .unwrap();
        (serde_json::from_value(identity).unwrap(), token)
    }
}
