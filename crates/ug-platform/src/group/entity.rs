//! Group Entity
//!
//! Groups form a tree through `mastergroup_id` and are typed by a
//! [`GroupType`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::group_type::entity::GroupType;
use crate::membership::entity::Membership;
use crate::resolver;
use crate::role::entity::Role;
use crate::shared::error::Result;
use crate::shared::middleware::RequestContext;
use crate::store::entity::{
    valid_by_default, Changes, Column, ColumnType, Entity, EntityKind, InsertInput, SqlValue,
    UpdateInput,
};
use crate::user::entity::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub email: Option<String>,
    pub abbreviation: Option<String>,
    pub grouptype_id: Option<Uuid>,
    /// Parent in the group tree
    pub mastergroup_id: Option<Uuid>,
    pub valid: Option<bool>,
    pub created: DateTime<Utc>,
    pub lastchange: DateTime<Utc>,
    pub createdby: Option<Uuid>,
    pub changedby: Option<Uuid>,
}

impl Group {
    pub async fn memberships(&self, ctx: &RequestContext) -> Result<Vec<Arc<Membership>>> {
        resolver::resolve_by_filter::<Membership>(ctx, "memberships", "group_id", self.id).await
    }

    /// Roles held on this group
    pub async fn roles(&self, ctx: &RequestContext) -> Result<Vec<Arc<Role>>> {
        resolver::resolve_by_filter::<Role>(ctx, "roles", "group_id", self.id).await
    }

    /// Direct children in the group tree
    pub async fn subgroups(&self, ctx: &RequestContext) -> Result<Vec<Arc<Group>>> {
        resolver::resolve_by_filter::<Group>(ctx, "subgroups", "mastergroup_id", self.id).await
    }

    pub async fn mastergroup(&self, ctx: &RequestContext) -> Result<Option<Arc<Group>>> {
        resolver::resolve_reference::<Group>(ctx, "mastergroup", self.mastergroup_id).await
    }

    pub async fn grouptype(&self, ctx: &RequestContext) -> Result<Option<Arc<GroupType>>> {
        resolver::resolve_reference::<GroupType>(ctx, "grouptype", self.grouptype_id).await
    }

    /// Users with a membership in this group.
    ///
    /// All users are fetched through one loader batch.
    pub async fn members(&self, ctx: &RequestContext) -> Result<Vec<Arc<User>>> {
        let memberships = self.memberships(ctx).await?;
        let user_ids: Vec<Uuid> = memberships.iter().filter_map(|m| m.user_id).collect();

        let users = futures::future::try_join_all(
            user_ids
                .into_iter()
                .map(|id| resolver::resolve_reference::<User>(ctx, "members", Some(id))),
        )
        .await?;

        Ok(users.into_iter().flatten().collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupInsert {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub email: Option<String>,
    pub abbreviation: Option<String>,
    pub grouptype_id: Option<Uuid>,
    pub mastergroup_id: Option<Uuid>,
    #[serde(default = "valid_by_default")]
    pub valid: Option<bool>,
    #[serde(skip)]
    pub createdby: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupUpdate {
    pub id: Uuid,
    pub lastchange: DateTime<Utc>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub email: Option<String>,
    pub abbreviation: Option<String>,
    pub grouptype_id: Option<Uuid>,
    pub mastergroup_id: Option<Uuid>,
    pub valid: Option<bool>,
    #[serde(skip)]
    pub changedby: Option<Uuid>,
}

impl Entity for Group {
    const KIND: EntityKind = EntityKind::Groups;

    const COLUMNS: &'static [Column] = &[
        Column::new("name", ColumnType::Text),
        Column::new("name_en", ColumnType::Text),
        Column::new("email", ColumnType::Text),
        Column::new("abbreviation", ColumnType::Text),
        Column::new("grouptype_id", ColumnType::Uuid),
        Column::new("mastergroup_id", ColumnType::Uuid),
        Column::new("valid", ColumnType::Bool),
    ];

    type Insert = GroupInsert;
    type Update = GroupUpdate;

    fn id(&self) -> Uuid {
        self.id
    }

}

impl InsertInput for GroupInsert {
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
            ("email", self.email.clone().into()),
            ("abbreviation", self.abbreviation.clone().into()),
            ("grouptype_id", self.grouptype_id.into()),
            ("mastergroup_id", self.mastergroup_id.into()),
            ("valid", self.valid.into()),
        ]
    }
}

impl UpdateInput for GroupUpdate {
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
            .set("email", &self.email)
            .set("abbreviation", &self.abbreviation)
            .set("grouptype_id", &self.grouptype_id)
            .set("mastergroup_id", &self.mastergroup_id)
            .set("valid", &self.valid)
            .into_values()
    }
}
