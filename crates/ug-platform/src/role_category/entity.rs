//! Role Category Entity

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resolver;
use crate::role_type::entity::RoleType;
use crate::shared::error::Result;
use crate::shared::middleware::RequestContext;
use crate::store::entity::{
    Changes, Column, ColumnType, Entity, EntityKind, InsertInput, SqlValue, UpdateInput,
};

/// Grouping of role types, e.g. academic or administrative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleCategory {
    pub id: Uuid,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub created: DateTime<Utc>,
    pub lastchange: DateTime<Utc>,
    pub createdby: Option<Uuid>,
    pub changedby: Option<Uuid>,
}

impl RoleCategory {
    pub async fn role_types(&self, ctx: &RequestContext) -> Result<Vec<Arc<RoleType>>> {
        resolver::resolve_by_filter::<RoleType>(ctx, "role_types", "category_id", self.id).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleCategoryInsert {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    #[serde(skip)]
    pub createdby: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleCategoryUpdate {
    pub id: Uuid,
    pub lastchange: DateTime<Utc>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    #[serde(skip)]
    pub changedby: Option<Uuid>,
}

impl Entity for RoleCategory {
    const KIND: EntityKind = EntityKind::RoleCategories;

    const COLUMNS: &'static [Column] = &[
        Column::new("name", ColumnType::Text),
        Column::new("name_en", ColumnType::Text),
    ];

    type Insert = RoleCategoryInsert;
    type Update = RoleCategoryUpdate;

    fn id(&self) -> Uuid {
        self.id
    }

}

impl InsertInput for RoleCategoryInsert {
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
        ]
    }
}

impl UpdateInput for RoleCategoryUpdate {
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
            .into_values()
    }
}
