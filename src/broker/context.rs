// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::Broker;
use crate::auth::CallerIdentity;
use crate::error::{ServiceError, ServiceResult};

/// Per-call context handed to every action.
#[derive(Clone)]
pub struct Context {
    broker: Broker,
    caller: Option<CallerIdentity>,
    level: u32,
}

impl Context {
    pub(crate) fn new(broker: Broker, caller: Option<CallerIdentity>, level: u32) -> Self {
        Self {
            broker,
            caller,
            level,
        }
    }

    pub fn caller(&self) -> Option<&CallerIdentity> {
        self.caller.as_ref()
    }

    /// The caller, or `Unauthorized`.
    pub fn require_caller(&self) -> ServiceResult<&CallerIdentity> {
        self.caller.as_ref().ok_or(ServiceError::Unauthorized)
    }

    /// Depth of this call; top-level calls are level 1.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Nested call on behalf of the same caller.
    pub async fn call(&self, action: &str, params: Value) -> ServiceResult<Value> {
        let child = Context::new(self.broker.clone(), self.caller.clone(), self.level + 1);
        self.broker.dispatch(action, params, &child).await
    }

    /// [`Context::call`] with typed params and result.
    pub async fn call_as<T, P>(&self, action: &str, params: P) -> ServiceResult<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let params = serde_json::to_value(params)?;
        let result = self.call(action, params).await?;
        Ok(serde_json::from_value(result)?)
    }
}
