// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `follows`: the social graph, as `(user, follow)` pairs.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::ledger::{Edge, Ledger};
use crate::broker::{parse_params, to_value, ActionDef, Context, Service};
use crate::error::{ServiceError, ServiceResult};
use crate::storage::records::new_id;
use crate::storage::FollowEdge;

impl Edge for FollowEdge {
    const SUBJECT: &'static str = "follow";
    const ACTOR: &'static str = "user";

    fn new(follow: String, user: String) -> Self {
        FollowEdge {
            id: new_id(),
            user,
            follow,
            created_at: Utc::now(),
        }
    }

    fn subject(&self) -> &str {
        &self.follow
    }

    fn actor(&self) -> &str {
        &self.user
    }

    fn duplicate() -> ServiceError {
        ServiceError::AlreadyFollowed
    }

    fn missing() -> ServiceError {
        ServiceError::NotFollowed
    }
}

/// `user` is the follower, `follow` the followee.
#[derive(Deserialize)]
struct PairParams {
    user: String,
    follow: String,
}

#[derive(Deserialize)]
struct CountParams {
    user: Option<String>,
    follow: Option<String>,
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
    ActionDef::internal("followees"),
];

pub struct FollowsService {
    ledger: Ledger<FollowEdge>,
}

impl FollowsService {
    pub fn new(ledger: Ledger<FollowEdge>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Service for FollowsService {
    fn name(&self) -> &'static str {
        "follows"
    }

    fn actions(&self) -> &'static [ActionDef] {
        ACTIONS
    }

    async fn call(&self, action: &str, params: Value, _ctx: &Context) -> ServiceResult<Value> {
        match action {
            "add" => {
                let p: PairParams = parse_params(params)?;
                if p.user == p.follow {
                    return Err(ServiceError::validation("Users cannot follow themselves"));
                }
                to_value(self.ledger.add(&p.follow, &p.user).await?)
            }
            "has" => {
                let p: PairParams = parse_params(params)?;
                to_value(self.ledger.has(&p.follow, &p.user).await?)
            }
            "count" => {
                let p: CountParams = parse_params(params)?;
                to_value(
                    self.ledger
                        .count(p.follow.as_deref(), p.user.as_deref())
                        .await?,
                )
            }
            "delete" => {
                let p: PairParams = parse_params(params)?;
                to_value(self.ledger.delete(&p.follow, &p.user).await?)
            }
            "followees" => {
                let p: UserParams = parse_params(params)?;
                to_value(self.ledger.subjects_of(&p.user).await?)
            }
            other => Err(ServiceError::ServiceNotFound(format!("follows.{other}"))),
        }
    }
}
