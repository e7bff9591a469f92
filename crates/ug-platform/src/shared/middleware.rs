//! API Middleware
//!
//! Builds the per-request [`RequestContext`] from the caller headers set by
//! the gateway. Authentication itself happens upstream; this service only
//! trusts `x-user-id` and `x-user-roles`.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use uuid::Uuid;

use crate::loader::{LoaderRegistry, LoaderSettings};
use crate::shared::authorization_service::{
    enforce, AuthorizationPolicy, Caller, FieldDescriptor, Resource,
};
use crate::shared::error::{PlatformError, Result};
use crate::store::Stores;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub settings: LoaderSettings,
    pub policy: Arc<dyn AuthorizationPolicy>,
}

impl AppState {
    pub fn new(
        stores: Stores,
        settings: LoaderSettings,
        policy: Arc<dyn AuthorizationPolicy>,
    ) -> Self {
        Self {
            stores,
            settings,
            policy,
        }
    }
}

/// Everything a resolver needs for one request
pub struct RequestContext {
    caller: Option<Caller>,
    loaders: LoaderRegistry,
    policy: Arc<dyn AuthorizationPolicy>,
}

impl RequestContext {
    pub fn new(
        caller: Option<Caller>,
        loaders: LoaderRegistry,
        policy: Arc<dyn AuthorizationPolicy>,
    ) -> Self {
        Self {
            caller,
            loaders,
            policy,
        }
    }

    /// Fresh context with an empty registry
    pub fn from_state(state: &AppState, caller: Option<Caller>) -> Self {
        Self::new(
            caller,
            LoaderRegistry::new(state.stores.clone(), state.settings),
            state.policy.clone(),
        )
    }

    /// Caller ID, for stamping `createdby` / `changedby`
    pub fn caller_id(&self) -> Option<Uuid> {
        self.caller.as_ref().map(|c| c.id)
    }

    pub fn loaders(&self) -> &LoaderRegistry {
        &self.loaders
    }

    /// Ask the policy whether `field` may be resolved.
    pub fn authorize(&self, field: &FieldDescriptor, resource: Option<&Resource>) -> Result<()> {
        enforce(self.policy.as_ref(), field, self.caller.as_ref(), resource)
    }
}

/// Read the caller from gateway headers. No `x-user-id` means anonymous.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Option<Caller>> {
    let Some(raw) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let id = raw
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| PlatformError::unauthorized("Invalid x-user-id header"))?;

    let roles: Vec<String> = headers
        .get(USER_ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Some(Caller { id, roles }))
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let caller = caller_from_headers(&parts.headers)?;
        Ok(RequestContext::from_state(state, caller))
    }
}
