//! Demo Data Seeder
//!
//! Seeds a small university on startup when `dev_mode` is on and the store
//! is still empty.
//!
//! Demo caller: `x-user-id: 2d9dc5ca-a4a2-11ed-b9df-0242ac120003`

use std::sync::Arc;

use tracing::info;
use uuid::{uuid, Uuid};

use crate::group::entity::{Group, GroupInsert};
use crate::group_type::entity::GroupTypeInsert;
use crate::loader::{LoaderRegistry, LoaderSettings};
use crate::membership::entity::MembershipInsert;
use crate::role::entity::RoleInsert;
use crate::role_category::entity::RoleCategoryInsert;
use crate::role_type::entity::{RoleType, RoleTypeInsert};
use crate::shared::error::Result;
use crate::store::Stores;
use crate::user::entity::{User, UserInsert};

/// ID of the seeded administrator
pub const DEMO_ADMIN_ID: Uuid = uuid!("2d9dc5ca-a4a2-11ed-b9df-0242ac120003");

/// Demo data seeder
pub struct DemoSeeder {
    loaders: LoaderRegistry,
}

impl DemoSeeder {
    pub fn new(stores: Stores) -> Self {
        Self {
            loaders: LoaderRegistry::new(stores, LoaderSettings::default()),
        }
    }

    /// Seed all demo data. Returns `false` when users already exist.
    pub async fn seed(&self) -> Result<bool> {
        if !self.loaders.users().page(0, 1, None).await?.is_empty() {
            info!("Store already populated, skipping demo data");
            return Ok(false);
        }

        info!("Seeding demo data...");

        let users = self.seed_users().await?;
        let groups = self.seed_groups().await?;
        let role_types = self.seed_role_types().await?;
        self.seed_memberships(&users, &groups).await?;
        self.seed_roles(&users, &groups, &role_types).await?;

        info!(
            users = users.len(),
            groups = groups.len(),
            role_types = role_types.len(),
            admin = %DEMO_ADMIN_ID,
            "Demo data seeded"
        );
        Ok(true)
    }

    async fn seed_users(&self) -> Result<Vec<Arc<User>>> {
        let people = [
            (Some(DEMO_ADMIN_ID), "John", "Newbie", "john.newbie@world.com"),
            (None, "Julia", "Newbie", "julia.newbie@world.com"),
            (None, "Peter", "Oldman", "peter.oldman@world.com"),
        ];

        let mut users = Vec::with_capacity(people.len());
        for (id, name, surname, email) in people {
            let user = self
                .loaders
                .users()
                .insert(UserInsert {
                    id,
                    name: Some(name.to_string()),
                    surname: Some(surname.to_string()),
                    email: Some(email.to_string()),
                    valid: Some(true),
                    createdby: Some(DEMO_ADMIN_ID),
                })
                .await?;
            users.push(user);
        }
        Ok(users)
    }

    /// University, one faculty, one department.
    async fn seed_groups(&self) -> Result<Vec<Arc<Group>>> {
        let mut groups: Vec<Arc<Group>> = Vec::new();
        let levels = [
            ("univerzita", "university", "Demo University", "UNI"),
            ("fakulta", "faculty", "Faculty of Informatics", "FI"),
            ("katedra", "department", "Department of Software", "DS"),
        ];

        for (type_name, type_name_en, name, abbreviation) in levels {
            let group_type = self
                .loaders
                .group_types()
                .insert(GroupTypeInsert {
                    id: None,
                    name: Some(type_name.to_string()),
                    name_en: Some(type_name_en.to_string()),
                    createdby: Some(DEMO_ADMIN_ID),
                })
                .await?;

            let group = self
                .loaders
                .groups()
                .insert(GroupInsert {
                    id: None,
                    name: Some(name.to_string()),
                    name_en: Some(name.to_string()),
                    email: None,
                    abbreviation: Some(abbreviation.to_string()),
                    grouptype_id: Some(group_type.id),
                    mastergroup_id: groups.last().map(|parent| parent.id),
                    valid: Some(true),
                    createdby: Some(DEMO_ADMIN_ID),
                })
                .await?;
            groups.push(group);
        }
        Ok(groups)
    }

    async fn seed_role_types(&self) -> Result<Vec<Arc<RoleType>>> {
        let category = self
            .loaders
            .role_categories()
            .insert(RoleCategoryInsert {
                id: None,
                name: Some("akademická".to_string()),
                name_en: Some("academic".to_string()),
                createdby: Some(DEMO_ADMIN_ID),
            })
            .await?;

        let mut role_types = Vec::new();
        for (name, name_en) in [
            ("rektor", "rector"),
            ("děkan", "dean"),
            ("vedoucí katedry", "head of department"),
        ] {
            let role_type = self
                .loaders
                .role_types()
                .insert(RoleTypeInsert {
                    id: None,
                    name: Some(name.to_string()),
                    name_en: Some(name_en.to_string()),
                    category_id: Some(category.id),
                    createdby: Some(DEMO_ADMIN_ID),
                })
                .await?;
            role_types.push(role_type);
        }
        Ok(role_types)
    }

    /// Everyone is a member of every group.
    async fn seed_memberships(&self, users: &[Arc<User>], groups: &[Arc<Group>]) -> Result<()> {
        for user in users {
            for group in groups {
                self.loaders
                    .memberships()
                    .insert(MembershipInsert {
                        id: None,
                        user_id: user.id,
                        group_id: group.id,
                        valid: Some(true),
                        startdate: None,
                        enddate: None,
                        createdby: Some(DEMO_ADMIN_ID),
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// User `n` holds role type `n` on group `n`.
    async fn seed_roles(
        &self,
        users: &[Arc<User>],
        groups: &[Arc<Group>],
        role_types: &[Arc<RoleType>],
    ) -> Result<()> {
        for ((user, group), role_type) in users.iter().zip(groups).zip(role_types) {
            self.loaders
                .roles()
                .insert(RoleInsert {
                    id: None,
                    user_id: user.id,
                    group_id: group.id,
                    roletype_id: role_type.id,
                    valid: Some(true),
                    startdate: Some(crate::store::timestamp_now()),
                    enddate: None,
                    createdby: Some(DEMO_ADMIN_ID),
                })
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{connect_in_memory, schema};

    #[tokio::test]
    async fn test_seed_once() {
        let pool = connect_in_memory().await.unwrap();
        schema::init_schema(&pool).await.unwrap();
        let stores = Stores::sqlite(pool);

        assert!(DemoSeeder::new(stores.clone()).seed().await.unwrap());
        assert!(!DemoSeeder::new(stores.clone()).seed().await.unwrap());

        let loaders = LoaderRegistry::new(stores, LoaderSettings::default());
        let admin = loaders.users().load(DEMO_ADMIN_ID).await.unwrap().unwrap();
        assert_eq!(admin.surname.as_deref(), Some("Newbie"));
        assert_eq!(loaders.groups().page(0, 10, None).await.unwrap().len(), 3);
        assert_eq!(loaders.memberships().page(0, 100, None).await.unwrap().len(), 9);
        assert_eq!(loaders.roles().filter_by("user_id", DEMO_ADMIN_ID).await.unwrap().len(), 1);
    }
}
