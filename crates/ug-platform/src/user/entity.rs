//! User Entity

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::membership::entity::Membership;
use crate::resolver;
use crate::role::entity::Role;
use crate::shared::error::Result;
use crate::shared::middleware::RequestContext;
use crate::store::entity::{
    valid_by_default, Changes, Column, ColumnType, Entity, EntityKind, InsertInput, SqlValue,
    UpdateInput,
};

/// A person known to the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub valid: Option<bool>,
    pub created: DateTime<Utc>,
    pub lastchange: DateTime<Utc>,
    pub createdby: Option<Uuid>,
    pub changedby: Option<Uuid>,
}

impl User {
    /// Group memberships of this user
    pub async fn memberships(&self, ctx: &RequestContext) -> Result<Vec<Arc<Membership>>> {
        resolver::resolve_by_filter::<Membership>(ctx, "memberships", "user_id", self.id).await
    }

    /// Roles held by this user
    pub async fn roles(&self, ctx: &RequestContext) -> Result<Vec<Arc<Role>>> {
        resolver::resolve_by_filter::<Role>(ctx, "roles", "user_id", self.id).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInsert {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    #[serde(default = "valid_by_default")]
    pub valid: Option<bool>,
    #[serde(skip)]
    pub createdby: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub id: Uuid,
    pub lastchange: DateTime<Utc>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub valid: Option<bool>,
    #[serde(skip)]
    pub changedby: Option<Uuid>,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::Users;

    const COLUMNS: &'static [Column] = &[
        Column::new("name", ColumnType::Text),
        Column::new("surname", ColumnType::Text),
        Column::new("email", ColumnType::Text),
        Column::new("valid", ColumnType::Bool),
    ];

    type Insert = UserInsert;
    type Update = UserUpdate;

    fn id(&self) -> Uuid {
        self.id
    }

}

impl InsertInput for UserInsert {
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
            ("surname", self.surname.clone().into()),
            ("email", self.email.clone().into()),
            ("valid", self.valid.into()),
        ]
    }
}

impl UpdateInput for UserUpdate {
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
            .set("surname", &self.surname)
            .set("email", &self.email)
            .set("valid", &self.valid)
            .into_values()
    }
}
