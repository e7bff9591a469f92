//! Authorization Service
//!
//! Field-level access control. Every resolver describes the field it is
//! about to resolve and asks the configured [`AuthorizationPolicy`] before
//! touching a loader.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::shared::error::{PlatformError, Result};
use crate::store::EntityKind;

/// Identity of the caller, as forwarded by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// User ID
    pub id: Uuid,

    /// Role names held by the user
    pub roles: Vec<String>,
}

impl Caller {
    pub fn new(id: Uuid) -> Self {
        Self { id, roles: Vec::new() }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Check if the caller has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the caller has any of the given roles
    pub fn has_any_role(&self, roles: &HashSet<String>) -> bool {
        self.roles.iter().any(|r| roles.contains(r))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Single entity or scalar field
    Read,
    /// Page or relation list
    ReadList,
    /// Insert or update
    Write,
}

/// The field being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub kind: EntityKind,
    pub field: &'static str,
    pub operation: Operation,
}

impl FieldDescriptor {
    pub const fn read(kind: EntityKind, field: &'static str) -> Self {
        Self { kind, field, operation: Operation::Read }
    }

    pub const fn list(kind: EntityKind, field: &'static str) -> Self {
        Self { kind, field, operation: Operation::ReadList }
    }

    pub const fn write(kind: EntityKind, field: &'static str) -> Self {
        Self { kind, field, operation: Operation::Write }
    }
}

/// The entity a field is resolved on, when known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub kind: EntityKind,
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

pub trait AuthorizationPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        field: &FieldDescriptor,
        caller: Option<&Caller>,
        resource: Option<&Resource>,
    ) -> Decision;
}

/// Any identified caller may read and write.
#[derive(Debug, Default)]
pub struct AuthenticatedPolicy;

impl AuthorizationPolicy for AuthenticatedPolicy {
    fn name(&self) -> &'static str {
        "authenticated"
    }

    fn evaluate(
        &self,
        _field: &FieldDescriptor,
        caller: Option<&Caller>,
        _resource: Option<&Resource>,
    ) -> Decision {
        match caller {
            Some(_) => Decision::Allow,
            None => Decision::Deny("authentication required".to_string()),
        }
    }
}

/// Reads need authentication (and a reader role when configured);
/// writes need a writer role.
#[derive(Debug, Default)]
pub struct RoleBasedPolicy {
    writer_roles: HashSet<String>,
    reader_roles: HashSet<String>,
}

impl RoleBasedPolicy {
    pub fn new(
        writer_roles: impl IntoIterator<Item = String>,
        reader_roles: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            writer_roles: writer_roles.into_iter().collect(),
            reader_roles: reader_roles.into_iter().collect(),
        }
    }
}

impl AuthorizationPolicy for RoleBasedPolicy {
    fn name(&self) -> &'static str {
        "role_based"
    }

    fn evaluate(
        &self,
        field: &FieldDescriptor,
        caller: Option<&Caller>,
        _resource: Option<&Resource>,
    ) -> Decision {
        let Some(caller) = caller else {
            return Decision::Deny("authentication required".to_string());
        };

        match field.operation {
            Operation::Write if !caller.has_any_role(&self.writer_roles) => Decision::Deny(
                format!("{}.{} requires a writer role", field.kind, field.field),
            ),
            Operation::Read | Operation::ReadList
                if !self.reader_roles.is_empty() && !caller.has_any_role(&self.reader_roles) =>
            {
                Decision::Deny(format!("{}.{} requires a reader role", field.kind, field.field))
            }
            _ => Decision::Allow,
        }
    }
}

/// Build the policy named by configuration.
pub fn build_policy(
    mode: &str,
    writer_roles: Vec<String>,
    reader_roles: Vec<String>,
) -> Result<Arc<dyn AuthorizationPolicy>> {
    match mode {
        "authenticated" => Ok(Arc::new(AuthenticatedPolicy)),
        "role_based" => Ok(Arc::new(RoleBasedPolicy::new(writer_roles, reader_roles))),
        other => Err(PlatformError::configuration(format!(
            "Unknown authorization mode: {}",
            other
        ))),
    }
}

/// Evaluate `policy` and turn a denial into the matching error.
pub fn enforce(
    policy: &dyn AuthorizationPolicy,
    field: &FieldDescriptor,
    caller: Option<&Caller>,
    resource: Option<&Resource>,
) -> Result<()> {
    match policy.evaluate(field, caller, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) if caller.is_none() => Err(PlatformError::unauthorized(reason)),
        Decision::Deny(reason) => {
            tracing::debug!(
                policy = policy.name(),
                kind = %field.kind,
                field = field.field,
                reason = %reason,
                "Access denied"
            );
            Err(PlatformError::forbidden(reason))
        }
    }
}
