//! Entity metadata shared by the store, loaders and resolvers.
//!
//! Every entity kind maps to one table. Columns are declared statically so
//! that SQL generation and filter validation work from the same whitelist.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::error::{PlatformError, Result};

/// The RBAC entity kinds served by this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Users,
    Groups,
    GroupTypes,
    RoleCategories,
    RoleTypes,
    Roles,
    Memberships,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Users,
        EntityKind::Groups,
        EntityKind::GroupTypes,
        EntityKind::RoleCategories,
        EntityKind::RoleTypes,
        EntityKind::Roles,
        EntityKind::Memberships,
    ];

    /// Registry name of the kind; also the table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Users => "users",
            EntityKind::Groups => "groups",
            EntityKind::GroupTypes => "grouptypes",
            EntityKind::RoleCategories => "rolecategories",
            EntityKind::RoleTypes => "roletypes",
            EntityKind::Roles => "roles",
            EntityKind::Memberships => "memberships",
        }
    }

    pub fn table(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PlatformError::validation(format!("Unknown entity kind: {}", s)))
    }
}

/// Storage type of a column; drives how JSON filter values are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
    Bool,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

/// Key and audit columns present on every table.
pub const AUDIT_COLUMNS: &[Column] = &[
    Column::new("id", ColumnType::Uuid),
    Column::new("created", ColumnType::Timestamp),
    Column::new("lastchange", ColumnType::Timestamp),
    Column::new("createdby", ColumnType::Uuid),
    Column::new("changedby", ColumnType::Uuid),
];

/// A value bound into a generated SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Coerce a JSON value into the storage type of `column`.
    pub fn from_json(column: &Column, value: &Value) -> Result<Self> {
        let invalid = || {
            PlatformError::validation(format!(
                "Invalid value {} for field '{}'",
                value, column.name
            ))
        };

        if value.is_null() {
            return Ok(SqlValue::Null);
        }

        match column.ty {
            ColumnType::Uuid => value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(SqlValue::Uuid)
                .ok_or_else(invalid),
            ColumnType::Timestamp => value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| SqlValue::Timestamp(dt.with_timezone(&Utc)))
                .ok_or_else(invalid),
            ColumnType::Bool => value.as_bool().map(SqlValue::Bool).ok_or_else(invalid),
            ColumnType::Text => match value {
                Value::String(s) => Ok(SqlValue::Text(s.clone())),
                Value::Number(n) => n
                    .as_i64()
                    .map(SqlValue::Int)
                    .or_else(|| n.as_f64().map(SqlValue::Real))
                    .ok_or_else(invalid),
                _ => Err(invalid()),
            },
        }
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A persisted row of one entity kind.
pub trait Entity:
    for<'r> FromRow<'r, SqliteRow> + Serialize + Clone + Send + Sync + Unpin + 'static
{
    const KIND: EntityKind;

    /// Payload columns, in table order, excluding [`AUDIT_COLUMNS`].
    const COLUMNS: &'static [Column];

    type Insert: InsertInput;
    type Update: UpdateInput;

    fn id(&self) -> Uuid;
}

/// Input of an insert mutation.
pub trait InsertInput: DeserializeOwned + Send + Sync + 'static {
    /// Client supplied key, if any.
    fn id(&self) -> Option<Uuid>;

    fn createdby(&self) -> Option<Uuid>;

    /// Record the acting user.
    fn stamp(&mut self, actor: Uuid);

    /// Values for every payload column.
    fn values(&self) -> Vec<(&'static str, SqlValue)>;
}

/// Input of an update mutation.
pub trait UpdateInput: DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> Uuid;

    /// Token the client last saw; the update only applies if it still matches.
    fn lastchange(&self) -> DateTime<Utc>;

    fn changedby(&self) -> Option<Uuid>;

    fn stamp(&mut self, actor: Uuid);

    /// Values for the payload columns the client supplied.
    fn values(&self) -> Vec<(&'static str, SqlValue)>;
}

/// New users, groups, roles and memberships are valid unless stated otherwise.
pub fn valid_by_default() -> Option<bool> {
    Some(true)
}

/// Builder for the values an update input actually carries.
#[derive(Debug, Default)]
pub struct Changes(Vec<(&'static str, SqlValue)>);

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name = value` when the client supplied the field.
    pub fn set<T: Clone + Into<SqlValue>>(mut self, name: &'static str, value: &Option<T>) -> Self {
        if let Some(value) = value {
            self.0.push((name, value.clone().into()));
        }
        self
    }

    pub fn into_values(self) -> Vec<(&'static str, SqlValue)> {
        self.0
    }
}

/// Audit and payload columns of `E`.
pub fn all_columns<E: Entity>() -> impl Iterator<Item = &'static Column> {
    AUDIT_COLUMNS.iter().chain(E::COLUMNS.iter())
}

/// Look a field up in the column whitelist of `E`.
pub fn column<E: Entity>(field: &str) -> Result<&'static Column> {
    all_columns::<E>()
        .find(|c| c.name == field)
        .ok_or_else(|| {
            PlatformError::validation(format!("Unknown field '{}' on {}", field, E::KIND))
        })
}
