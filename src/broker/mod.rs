// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service Broker
//!
//! In-process RPC transport between the data-owning services.
//!
//! Services register under a name and expose a static table of actions.
//! An action is invoked as `"service.action"` with JSON params and an
//! explicit [`Context`] carrying the optional caller identity:
//!
//! ```rust,ignore
//! let profile = broker
//!     .call("users.profile", json!({ "username": "jane" }), caller)
//!     .await?;
//! ```
//!
//! ## Access levels
//!
//! - [`Access::Public`]: anyone, with or without a caller
//! - [`Access::Authenticated`]: rejected with `Unauthorized` before the
//!   handler runs when no caller is attached
//! - [`Access::Internal`]: service-to-service only; [`Broker::request`]
//!   (the gateway entry point) refuses to dispatch them
//!
//! Nested calls made through [`Context::call`] inherit the caller and
//! increment the call level; exceeding the configured maximum fails with
//! `MaxCallLevel`.

mod context;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::CallerIdentity;
use crate::error::{ServiceError, ServiceResult};

pub use context::Context;

/// Default limit on nested broker calls.
pub const DEFAULT_MAX_CALL_LEVEL: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Internal,
}

/// One entry in a service's action table.
#[derive(Debug, Clone, Copy)]
pub struct ActionDef {
    pub name: &'static str,
    pub access: Access,
}

impl ActionDef {
    pub const fn public(name: &'static str) -> Self {
        Self {
            name,
            access: Access::Public,
        }
    }

    pub const fn authenticated(name: &'static str) -> Self {
        Self {
            name,
            access: Access::Authenticated,
        }
    }

    pub const fn internal(name: &'static str) -> Self {
        Self {
            name,
            access: Access::Internal,
        }
    }
}

/// A named service reachable through the broker.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn actions(&self) -> &'static [ActionDef];

    /// Handle `action` (without the service prefix). Access checks have
    /// already been applied by the broker.
    async fn call(&self, action: &str, params: Value, ctx: &Context) -> ServiceResult<Value>;
}

/// Deserialize action params; `null` counts as an empty object.
pub fn parse_params<T: DeserializeOwned>(params: Value) -> ServiceResult<T> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params)
        .map_err(|e| ServiceError::validation(format!("Invalid parameters: {e}")))
}

/// Serialize an action result.
pub fn to_value<T: serde::Serialize>(value: T) -> ServiceResult<Value> {
    Ok(serde_json::to_value(value)?)
}

struct BrokerInner {
    services: HashMap<&'static str, Arc<dyn Service>>,
    max_call_level: u32,
}

/// Cheap-to-clone handle to the registered services.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl Broker {
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    pub fn max_call_level(&self) -> u32 {
        self.inner.max_call_level
    }

    /// Trusted in-process call; every access level is reachable.
    pub async fn call(
        &self,
        action: &str,
        params: Value,
        caller: Option<CallerIdentity>,
    ) -> ServiceResult<Value> {
        let ctx = Context::new(self.clone(), caller, 1);
        self.dispatch(action, params, &ctx).await
    }

    /// Gateway entry point. Internal actions are not exposed here.
    pub async fn request(
        &self,
        action: &str,
        params: Value,
        caller: Option<CallerIdentity>,
    ) -> ServiceResult<Value> {
        let (service, def) = self.resolve(action)?;
        if def.access == Access::Internal {
            return Err(ServiceError::ServiceNotFound(action.to_string()));
        }
        let ctx = Context::new(self.clone(), caller, 1);
        self.invoke(action, service, def, params, &ctx).await
    }

    pub(crate) async fn dispatch(
        &self,
        action: &str,
        params: Value,
        ctx: &Context,
    ) -> ServiceResult<Value> {
        let (service, def) = self.resolve(action)?;
        self.invoke(action, service, def, params, ctx).await
    }

    fn resolve(&self, action: &str) -> ServiceResult<(Arc<dyn Service>, ActionDef)> {
        let not_found = || ServiceError::ServiceNotFound(action.to_string());
        let (service_name, action_name) = action.split_once('.').ok_or_else(not_found)?;
        let service = self
            .inner
            .services
            .get(service_name)
            .ok_or_else(not_found)?;
        let def = service
            .actions()
            .iter()
            .find(|def| def.name == action_name)
            .copied()
            .ok_or_else(not_found)?;
        Ok((Arc::clone(service), def))
    }

    async fn invoke(
        &self,
        action: &str,
        service: Arc<dyn Service>,
        def: ActionDef,
        params: Value,
        ctx: &Context,
    ) -> ServiceResult<Value> {
        if ctx.level() > self.inner.max_call_level {
            warn!(action, level = ctx.level(), "maximum call level exceeded");
            return Err(ServiceError::MaxCallLevel(self.inner.max_call_level));
        }
        if def.access == Access::Authenticated && ctx.caller().is_none() {
            return Err(ServiceError::Unauthorized);
        }

        debug!(
            action,
            level = ctx.level(),
            caller = ctx.caller().map(|c| c.id.as_str()),
            "dispatch"
        );
        service.call(def.name, params, ctx).await
    }
}

pub struct BrokerBuilder {
    services: HashMap<&'static str, Arc<dyn Service>>,
    max_call_level: u32,
}

impl Default for BrokerBuilder {
    fn default() -> Self {
        Self {
            services: HashMap::new(),
            max_call_level: DEFAULT_MAX_CALL_LEVEL,
        }
    }
}

impl BrokerBuilder {
    pub fn max_call_level(mut self, level: u32) -> Self {
        self.max_call_level = level;
        self
    }

    pub fn service(mut self, service: impl Service) -> Self {
        let name = service.name();
        if self.services.insert(name, Arc::new(service)).is_some() {
            warn!(service = name, "service registered twice; keeping the last one");
        }
        self
    }

    pub fn build(self) -> Broker {
        Broker {
            inner: Arc::new(BrokerInner {
                services: self.services,
                max_call_level: self.max_call_level,
            }),
        }
    }
}
