//! Loader Registry
//!
//! Hands out exactly one loader per entity kind for the lifetime of a
//! request. Loaders are created on first use.

use std::sync::OnceLock;

use super::{Loader, LoaderSettings};
use crate::group::entity::Group;
use crate::group_type::entity::GroupType;
use crate::membership::entity::Membership;
use crate::role::entity::Role;
use crate::role_category::entity::RoleCategory;
use crate::role_type::entity::RoleType;
use crate::store::{Entity, EntityKind, Stores};
use crate::user::entity::User;

/// Per-request set of loaders.
pub struct LoaderRegistry {
    stores: Stores,
    settings: LoaderSettings,
    users: OnceLock<Loader<User>>,
    groups: OnceLock<Loader<Group>>,
    group_types: OnceLock<Loader<GroupType>>,
    role_categories: OnceLock<Loader<RoleCategory>>,
    role_types: OnceLock<Loader<RoleType>>,
    roles: OnceLock<Loader<Role>>,
    memberships: OnceLock<Loader<Membership>>,
}

impl LoaderRegistry {
    pub fn new(stores: Stores, settings: LoaderSettings) -> Self {
        Self {
            stores,
            settings,
            users: OnceLock::new(),
            groups: OnceLock::new(),
            group_types: OnceLock::new(),
            role_categories: OnceLock::new(),
            role_types: OnceLock::new(),
            roles: OnceLock::new(),
            memberships: OnceLock::new(),
        }
    }

    pub fn users(&self) -> &Loader<User> {
        self.users
            .get_or_init(|| Loader::new(self.stores.users.clone(), self.settings))
    }

    pub fn groups(&self) -> &Loader<Group> {
        self.groups
            .get_or_init(|| Loader::new(self.stores.groups.clone(), self.settings))
    }

    pub fn group_types(&self) -> &Loader<GroupType> {
        self.group_types
            .get_or_init(|| Loader::new(self.stores.group_types.clone(), self.settings))
    }

    pub fn role_categories(&self) -> &Loader<RoleCategory> {
        self.role_categories
            .get_or_init(|| Loader::new(self.stores.role_categories.clone(), self.settings))
    }

    pub fn role_types(&self) -> &Loader<RoleType> {
        self.role_types
            .get_or_init(|| Loader::new(self.stores.role_types.clone(), self.settings))
    }

    pub fn roles(&self) -> &Loader<Role> {
        self.roles
            .get_or_init(|| Loader::new(self.stores.roles.clone(), self.settings))
    }

    pub fn memberships(&self) -> &Loader<Membership> {
        self.memberships
            .get_or_init(|| Loader::new(self.stores.memberships.clone(), self.settings))
    }

    /// Loader for any registered entity type.
    pub fn get<E: RegisteredEntity>(&self) -> &Loader<E> {
        E::loader(self)
    }

    /// Whether the loader of `kind` has been created in this request.
    pub fn is_materialized(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Users => self.users.get().is_some(),
            EntityKind::Groups => self.groups.get().is_some(),
            EntityKind::GroupTypes => self.group_types.get().is_some(),
            EntityKind::RoleCategories => self.role_categories.get().is_some(),
            EntityKind::RoleTypes => self.role_types.get().is_some(),
            EntityKind::Roles => self.roles.get().is_some(),
            EntityKind::Memberships => self.memberships.get().is_some(),
        }
    }

    /// Kinds whose loader exists, in [`EntityKind::ALL`] order.
    pub fn materialized(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.is_materialized(*kind))
            .collect()
    }
}

/// Entity types reachable through the registry.
pub trait RegisteredEntity: Entity {
    fn loader(registry: &LoaderRegistry) -> &Loader<Self>;
}

impl RegisteredEntity for User {
    fn loader(registry: &LoaderRegistry) -> &Loader<Self> {
        registry.users()
    }
}

impl RegisteredEntity for Group {
    fn loader(registry: &LoaderRegistry) -> &Loader<Self> {
        registry.groups()
    }
}

impl RegisteredEntity for GroupType {
    fn loader(registry: &LoaderRegistry) -> &Loader<Self> {
        registry.group_types()
    }
}

impl RegisteredEntity for RoleCategory {
    fn loader(registry: &LoaderRegistry) -> &Loader<Self> {
        registry.role_categories()
    }
}

impl RegisteredEntity for RoleType {
    fn loader(registry: &LoaderRegistry) -> &Loader<Self> {
        registry.role_types()
    }
}

impl RegisteredEntity for Role {
    fn loader(registry: &LoaderRegistry) -> &Loader<Self> {
        registry.roles()
    }
}

impl RegisteredEntity for Membership {
    fn loader(registry: &LoaderRegistry) -> &Loader<Self> {
        registry.memberships()
    }
}
