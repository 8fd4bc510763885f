// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `favorites`: which user favorited which article.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::ledger::{Edge, Ledger};
use crate::broker::{parse_params, to_value, ActionDef, Context, Service};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::records::new_id;
use crate::storage::FavoriteEdge;

impl Edge for FavoriteEdge {
    const SUBJECT: &'static str = "article";
    const ACTOR: &'static str = "user";

    fn new(article: String, user: String) -> Self {
        FavoriteEdge {
            id: new_id(),
            article,
            user,
            created_at: Utc::now(),
        }
    }

    fn subject(&self) -> &str {
        &self.article
    }

    fn actor(&self) -> &str {
        &self.user
    }

    fn duplicate() -> ServiceError {
        ServiceError::AlreadyFavorited
    }

    fn missing() -> ServiceError {
        ServiceError::NotFavorited
    }
}

#[derive(Deserialize)]
struct PairParams {
    article: String,
    user: String,
}

#[derive(Deserialize)]
struct CountParams {
    article: Option<String>,
    user: Option<String>,
}

#[derive(Deserialize)]
struct ArticleParams {
    article: String,
}

#[derive(Deserialize)]
struct UserParams {
    user: String,
}

const ACTIONS: &[ActionDef] = &[
    ActionDef::internal("add"),
    ActionDef::internal("has"),
    ActionDef::internal("count"),
    ActionDef::internal("delete"),
    ActionDef::internal("removeByArticle"),
    ActionDef::internal("articles"),
];

pub struct FavoritesService {
    ledger: Ledger<FavoriteEdge>,
}

impl FavoritesService {
    pub fn new(ledger: Ledger<FavoriteEdge>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Service for FavoritesService {
    fn name(&self) -> &'static str {
        "favorites"
    }

    fn actions(&self) -> &'static [ActionDef] {
        ACTIONS
    }

    async fn call(&self, action: &str, params: Value, _ctx: &Context) -> ServiceResult<Value> {
        match action {
            "add" => {
                let p: PairParams = parse_params(params)?;
                to_value(self.ledger.add(&p.article, &p.user).await?)
            }
            "has" => {
                let p: PairParams = parse_params(params)?;
                to_value(self.ledger.has(&p.article, &p.user).await?)
            }
            "count" => {
                let p: CountParams = parse_params(params)?;
                to_value(
                    self.ledger
                        .count(p.article.as_deref(), p.user.as_deref())
                        .await?,
                )
            }
            "delete" => {
                let p: PairParams = parse_params(params)?;
                to_value(self.ledger.delete(&p.article, &p.user).await?)
            }
            "removeByArticle" => {
                let p: ArticleParams = parse_params(params)?;
                to_value(self.ledger.remove_by_subject(&p.article).await?)
            }
            "articles" => {
                let p: UserParams = parse_params(params)?;
                to_value(self.ledger.subjects_of(&p.user).await?)
            }
            other => Err(ServiceError::ServiceNotFound(format!("favorites.{other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ServiceError;
    use crate::services::test_support::broker;
    use serde_json::json;

    #[tokio::test]
    async fn add_has_count_delete_cycle() {
        let broker = broker();
        let pair = json!({"article": "a1", "user": "u1"});

        broker.call("favorites.add", pair.clone(), None).await.unwrap();
        assert_eq!(broker.call("favorites.has", pair.clone(), None).await.unwrap(), json!(true));
        assert_eq!(
            broker.call("favorites.count", json!({"article": "a1"}), None).await.unwrap(),
            json!(1)
        );

        let err = broker.call("favorites.add", pair.clone(), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyFavorited));

        broker.call("favorites.delete", pair.clone(), None).await.unwrap();
        assert_eq!(broker.call("favorites.has", pair.clone(), None).await.unwrap(), json!(false));

        let err = broker.call("favorites.delete", pair, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFavorited));
    }

    #[tokio::test]
    async fn count_needs_exactly_one_filter() {
        let broker = broker();
        for params in [json!({}), json!({"article": "a1", "user": "u1"})] {
            let err = broker.call("favorites.count", params, None).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }

        broker
            .call("favorites.add", json!({"article": "a1", "user": "u1"}), None)
            .await
            .unwrap();
        broker
            .call("favorites.add", json!({"article": "a2", "user": "u1"}), None)
            .await
            .unwrap();
        assert_eq!(
            broker.call("favorites.count", json!({"user": "u1"}), None).await.unwrap(),
            json!(2)
        );
    }

    #[tokio::test]
    async fn remove_by_article_and_bulk_projection() {
        let broker = broker();
        for (article, user) in [("a1", "u1"), ("a1", "u2"), ("a2", "u1")] {
            broker
                .call("favorites.add", json!({"article": article, "user": user}), None)
                .await
                .unwrap();
        }

        let removed = broker
            .call("favorites.removeByArticle", json!({"article": "a1"}), None)
            .await
            .unwrap();
        assert_eq!(removed, json!(2));
        assert_eq!(
            broker.call("favorites.count", json!({"article": "a1"}), None).await.unwrap(),
            json!(0)
        );
        assert_eq!(
            broker.call("favorites.articles", json!({"user": "u1"}), None).await.unwrap(),
            json!(["a2"])
        );
    }

    #[tokio::test]
    async fn concurrent_duplicate_adds_yield_one_edge() {
        let broker = broker();
        let attempts = (0..8)
            .map(|_| {
                let broker = broker.clone();
                tokio::spawn(async move {
                    broker
                        .call("favorites.add", json!({"article": "a1", "user": "u1"}), None)
                        .await
                })
            })
            .collect::<Vec<_>>();

        let mut conflicts = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => {}
                Err(ServiceError::AlreadyFavorited) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(conflicts, 7);
        assert_eq!(
            broker.call("favorites.count", json!({"article": "a1"}), None).await.unwrap(),
            json!(1)
        );
    }

    #[tokio::test]
    async fn ids_containing_colons_keep_distinct_pairs() {
        let broker = broker();
        broker
            .call("favorites.add", json!({"article": "a:b", "user": "c"}), None)
            .await
            .unwrap();
        broker
            .call("favorites.add", json!({"article": "a", "user": "b:c"}), None)
            .await
            .unwrap();

        let has = broker
            .call("favorites.has", json!({"article": "a", "user": "b:c"}), None)
            .await
            .unwrap();
        assert_eq!(has, json!(true));
        let missing = broker
            .call("favorites.has", json!({"article": "a:b", "user": "b:c"}), None)
            .await
            .unwrap();
        assert_eq!(missing, json!(false));
    }
}
