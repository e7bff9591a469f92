//! Entity Store
//!
//! Relational persistence behind the loaders. [`EntityStore`] is the seam;
//! [`SqlStore`] implements it for every entity kind over a SQLite pool.

pub mod entity;
pub mod filter;
pub mod schema;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

pub use entity::{Entity, EntityKind, InsertInput, SqlValue, UpdateInput};
pub use filter::WhereFilter;
pub use sqlite::SqlStore;

use crate::group::entity::Group;
use crate::group_type::entity::GroupType;
use crate::membership::entity::Membership;
use crate::role::entity::Role;
use crate::role_category::entity::RoleCategory;
use crate::role_type::entity::RoleType;
use crate::shared::error::Result;
use crate::user::entity::User;

/// Most `?` placeholders SQLite accepts in one statement.
pub const MAX_BIND_PARAMETERS: usize = 32_766;

/// Result of an optimistic-concurrency update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T> {
    Updated(T),
    /// No row with the given key.
    NotFound,
    /// The row exists but its `lastchange` no longer matches the token.
    Conflict,
}

impl<T> UpdateOutcome<T> {
    pub fn into_record(self) -> Option<T> {
        match self {
            UpdateOutcome::Updated(record) => Some(record),
            UpdateOutcome::NotFound | UpdateOutcome::Conflict => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> UpdateOutcome<U> {
        match self {
            UpdateOutcome::Updated(record) => UpdateOutcome::Updated(f(record)),
            UpdateOutcome::NotFound => UpdateOutcome::NotFound,
            UpdateOutcome::Conflict => UpdateOutcome::Conflict,
        }
    }
}

/// Backend operations the loader of one entity kind consumes.
#[async_trait]
pub trait EntityStore<E: Entity>: Send + Sync {
    /// Fetch all rows whose key is in `ids`. Missing keys are simply absent.
    async fn fetch_by_ids(&self, ids: &[Uuid]) -> Result<Vec<E>>;

    /// Rows where `field = value`, in insertion order.
    async fn filter_by(&self, field: &str, value: SqlValue) -> Result<Vec<E>>;

    /// Offset page in insertion order, optionally filtered.
    async fn page(&self, skip: i64, limit: i64, filter: Option<&WhereFilter>) -> Result<Vec<E>>;

    /// Persist a new row with the given key and timestamp.
    async fn insert(&self, id: Uuid, now: DateTime<Utc>, input: &E::Insert) -> Result<E>;

    /// Apply `input` only if the stored `lastchange` equals the input token.
    async fn update(&self, now: DateTime<Utc>, input: &E::Update) -> Result<UpdateOutcome<E>>;
}

/// One store per entity kind.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn EntityStore<User>>,
    pub groups: Arc<dyn EntityStore<Group>>,
    pub group_types: Arc<dyn EntityStore<GroupType>>,
    pub role_categories: Arc<dyn EntityStore<RoleCategory>>,
    pub role_types: Arc<dyn EntityStore<RoleType>>,
    pub roles: Arc<dyn EntityStore<Role>>,
    pub memberships: Arc<dyn EntityStore<Membership>>,
}

impl Stores {
    /// SQL-backed stores sharing one pool.
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            users: Arc::new(SqlStore::<User>::new(pool.clone())),
            groups: Arc::new(SqlStore::<Group>::new(pool.clone())),
            group_types: Arc::new(SqlStore::<GroupType>::new(pool.clone())),
            role_categories: Arc::new(SqlStore::<RoleCategory>::new(pool.clone())),
            role_types: Arc::new(SqlStore::<RoleType>::new(pool.clone())),
            roles: Arc::new(SqlStore::<Role>::new(pool.clone())),
            memberships: Arc::new(SqlStore::<Membership>::new(pool)),
        }
    }
}

/// Timestamp used for `created` / `lastchange`.
///
/// Truncated to microseconds so the token survives a round trip through
/// clients that do not keep nanoseconds.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Token written by an update that consumes `previous`.
///
/// Always strictly later than `previous`, so a consumed token can never match
/// the row again even when the clock has not advanced.
pub fn next_token(now: DateTime<Utc>, previous: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Open a SQLite pool for `url`, creating the database file if needed.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!(url = %url, max_connections, "Connected to database");
    Ok(pool)
}

/// Single-connection in-memory pool; every connection of an in-memory
/// SQLite database is a separate database, so the one connection is kept
/// alive for the pool's lifetime.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_outcome_into_record() {
        assert_eq!(UpdateOutcome::Updated(1).into_record(), Some(1));
        assert_eq!(UpdateOutcome::<i32>::NotFound.into_record(), None);
        assert_eq!(UpdateOutcome::<i32>::Conflict.into_record(), None);
        assert_eq!(UpdateOutcome::Updated(2).map(|v| v * 2), UpdateOutcome::Updated(4));
    }

    #[test]
    fn test_timestamp_has_microsecond_precision() {
        let now = timestamp_now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }
}
