//! Membership Entity

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::group::entity::Group;
use crate::resolver;
use crate::shared::error::Result;
use crate::shared::middleware::RequestContext;
use crate::store::entity::{
    valid_by_default, Changes, Column, ColumnType, Entity, EntityKind, InsertInput, SqlValue,
    UpdateInput,
};
use crate::user::entity::User;

/// Relation between a user and a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub group_id: Option<Uuid>,
    /// Whether the membership is still valid
    pub valid: Option<bool>,
    pub startdate: Option<DateTime<Utc>>,
    pub enddate: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub lastchange: DateTime<Utc>,
    pub createdby: Option<Uuid>,
    pub changedby: Option<Uuid>,
}

impl Membership {
    pub async fn user(&self, ctx: &RequestContext) -> Result<Option<Arc<User>>> {
        resolver::resolve_reference::<User>(ctx, "user", self.user_id).await
    }

    pub async fn group(&self, ctx: &RequestContext) -> Result<Option<Arc<Group>>> {
        resolver::resolve_reference::<Group>(ctx, "group", self.group_id).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipInsert {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub group_id: Uuid,
    #[serde(default = "valid_by_default")]
    pub valid: Option<bool>,
    pub startdate: Option<DateTime<Utc>>,
    pub enddate: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub createdby: Option<Uuid>,
}

/// User and group of a membership cannot be changed.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipUpdate {
    pub id: Uuid,
    pub lastchange: DateTime<Utc>,
    pub valid: Option<bool>,
    pub startdate: Option<DateTime<Utc>>,
    pub enddate: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub changedby: Option<Uuid>,
}

impl Entity for Membership {
    const KIND: EntityKind = EntityKind::Memberships;

    const COLUMNS: &'static [Column] = &[
        Column::new("user_id", ColumnType::Uuid),
        Column::new("group_id", ColumnType::Uuid),
        Column::new("valid", ColumnType::Bool),
        Column::new("startdate", ColumnType::Timestamp),
        Column::new("enddate", ColumnType::Timestamp),
    ];

    type Insert = MembershipInsert;
    type Update = MembershipUpdate;

    fn id(&self) -> Uuid {
        self.id
    }

}

impl InsertInput for MembershipInsert {
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
            ("valid", self.valid.into()),
            ("startdate", self.startdate.into()),
            ("enddate", self.enddate.into()),
        ]
    }
}

impl UpdateInput for MembershipUpdate {
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
            .set("valid", &self.valid)
            .set("startdate", &self.startdate)
            .set("enddate", &self.enddate)
            .into_values()
    }
}
