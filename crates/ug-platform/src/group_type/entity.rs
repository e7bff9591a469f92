//! Group Type Entity

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::group::entity::Group;
use crate::resolver;
use crate::shared::error::Result;
use crate::shared::middleware::RequestContext;
use crate::store::entity::{
    Changes, Column, ColumnType, Entity, EntityKind, InsertInput, SqlValue, UpdateInput,
};

/// Kind of group, e.g. faculty or department
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupType {
    pub id: Uuid,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub created: DateTime<Utc>,
    pub lastchange: DateTime<Utc>,
    pub createdby: Option<Uuid>,
    pub changedby: Option<Uuid>,
}

impl GroupType {
    /// Groups of this type
    pub async fn groups(&self, ctx: &RequestContext) -> Result<Vec<Arc<Group>>> {
        resolver::resolve_by_filter::<Group>(ctx, "groups", "grouptype_id", self.id).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupTypeInsert {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    #[serde(skip)]
    pub createdby: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupTypeUpdate {
    pub id: Uuid,
    pub lastchange: DateTime<Utc>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    #[serde(skip)]
    pub changedby: Option<Uuid>,
}

impl Entity for GroupType {
    const KIND: EntityKind = EntityKind::GroupTypes;

    const COLUMNS: &'static [Column] = &[
        Column::new("name", ColumnType::Text),
        Column::new("name_en", ColumnType::Text),
    ];

    type Insert = GroupTypeInsert;
    type Update = GroupTypeUpdate;

    fn id(&self) -> Uuid {
        self.id
    }

}

impl InsertInput for GroupTypeInsert {
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

impl UpdateInput for GroupTypeUpdate {
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
