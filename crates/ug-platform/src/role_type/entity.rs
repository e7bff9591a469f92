//! Role Type Entity

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resolver;
use crate::role::entity::Role;
use crate::role_category::entity::RoleCategory;
use crate::shared::error::Result;
use crate::shared::middleware::RequestContext;
use crate::store::entity::{
    Changes, Column, ColumnType, Entity, EntityKind, InsertInput, SqlValue, UpdateInput,
};

/// A kind of role, e.g. dean or head of department
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleType {
    pub id: Uuid,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub category_id: Option<Uuid>,
    pub created: DateTime<Utc>,
    pub lastchange: DateTime<Utc>,
    pub createdby: Option<Uuid>,
    pub changedby: Option<Uuid>,
}

impl RoleType {
    /// Roles of this type
    pub async fn roles(&self, ctx: &RequestContext) -> Result<Vec<Arc<Role>>> {
        resolver::resolve_by_filter::<Role>(ctx, "roles", "roletype_id", self.id).await
    }

    pub async fn category(&self, ctx: &RequestContext) -> Result<Option<Arc<RoleCategory>>> {
        resolver::resolve_reference::<RoleCategory>(ctx, "category", self.category_id).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleTypeInsert {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(skip)]
    pub createdby: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleTypeUpdate {
    pub id: Uuid,
    pub lastchange: DateTime<Utc>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(skip)]
    pub changedby: Option<Uuid>,
}

impl Entity for RoleType {
    const KIND: EntityKind = EntityKind::RoleTypes;

    const COLUMNS: &'static [Column] = &[
        Column::new("name", ColumnType::Text),
        Column::new("name_en", ColumnType::Text),
        Column::new("category_id", ColumnType::Uuid),
    ];

    type Insert = RoleTypeInsert;
    type Update = RoleTypeUpdate;

    fn id(&self) -> Uuid {
        self.id
    }

}

impl InsertInput for RoleTypeInsert {
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
            ("name", self.name.clone().into()),
            ("name_en", self.name_en.clone().into()),
            ("category_id", self.category_id.into()),
        ]
    }
}

impl UpdateInput for RoleTypeUpdate {
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
            .set("name", &self.name)
            .set("name_en", &self.name_en)
            .set("category_id", &self.category_id)
            .into_values()
    }
}
