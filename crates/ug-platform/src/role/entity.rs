//! Role Entity
//!
//! A role binds a user to a group with a role type, e.g. the dean of a
//! faculty.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::group::entity::Group;
use crate::resolver;
use crate::role_type::entity::RoleType;
use crate::shared::error::Result;
use crate::shared::middleware::RequestContext;
use crate::store::entity::{
    valid_by_default, Changes, Column, ColumnType, Entity, EntityKind, InsertInput, SqlValue,
    UpdateInput,
};
use crate::user::entity::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    pub roletype_id: Option<Uuid>,
    pub valid: Option<bool>,
    pub startdate: Option<DateTime<Utc>>,
    pub enddate: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub lastchange: DateTime<Utc>,
    pub createdby: Option<Uuid>,
    pub changedby: Option<Uuid>,
}

impl Role {
    pub async fn user(&self, ctx: &RequestContext) -> Result<Option<Arc<User>>> {
        resolver::resolve_reference::<User>(ctx, "user", self.user_id).await
    }

    pub async fn group(&self, ctx: &RequestContext) -> Result<Option<Arc<Group>>> {
        resolver::resolve_reference::<Group>(ctx, "group", self.group_id).await
    }

    pub async fn roletype(&self, ctx: &RequestContext) -> Result<Option<Arc<RoleType>>> {
        resolver::resolve_reference::<RoleType>(ctx, "roletype", self.roletype_id).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleInsert {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub roletype_id: Uuid,
    #[serde(default = "valid_by_default")]
    pub valid: Option<bool>,
    pub startdate: Option<DateTime<Utc>>,
    pub enddate: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub createdby: Option<Uuid>,
}

/// User and group of a role are fixed once it exists.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdate {
    pub id: Uuid,
    pub lastchange: DateTime<Utc>,
    pub roletype_id: Option<Uuid>,
    pub valid: Option<bool>,
    pub startdate: Option<DateTime<Utc>>,
    pub enddate: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub changedby: Option<Uuid>,
}

impl Entity for Role {
    const KIND: EntityKind = EntityKind::Roles;

    const COLUMNS: &'static [Column] = &[
        Column::new("user_id", ColumnType::Uuid),
        Column::new("group_id", ColumnType::Uuid),
        Column::new("roletype_id", ColumnType::Uuid),
        Column::new("valid", ColumnType::Bool),
        Column::new("startdate", ColumnType::Timestamp),
        Column::new("enddate", ColumnType::Timestamp),
    ];

    type Insert = RoleInsert;
    type Update = RoleUpdate;

    fn id(&self) -> Uuid {
        self.id
    }

}

impl InsertInput for RoleInsert {
    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn createdby(&self) -> Option<Uuid> {
        self.createdby
    }

    fn stamp(&mut self, actor: Uuid) {
        self.createdby = Some(actor);
    }

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("user_id", self.user_id.into()),
            ("group_id", self.group_id.into()),
            ("roletype_id", self.roletype_id.into()),
            ("valid", self.valid.into()),
            ("startdate", self.startdate.into()),
            ("enddate", self.enddate.into()),
        ]
    }
}

impl UpdateInput for RoleUpdate {
    fn id(&self) -> Uuid {
        self.id
    }

    fn lastchange(&self) -> DateTime<Utc> {
        self.lastchange
    }

    fn changedby(&self) -> Option<Uuid> {
        self.changedby
    }

    fn stamp(&mut self, actor: Uuid) {
        self.changedby = Some(actor);
    }

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        Changes::new()
            .set("roletype_id", &self.roletype_id)
            .set("valid", &self.valid)
            .set("startdate", &self.startdate)
            .set("enddate", &self.enddate)
            .into_values()
    }
}
