//! Table definitions
//!
//! Creates the seven entity tables and their lookup indexes if they do not
//! exist yet. Keys and user references are 16-byte UUID blobs, timestamps
//! RFC 3339 text.

use sqlx::SqlitePool;
use tracing::info;

use crate::shared::error::Result;

const AUDIT: &str = "id BLOB PRIMARY KEY NOT NULL, \
     created TEXT NOT NULL, \
     lastchange TEXT NOT NULL, \
     createdby BLOB, \
     changedby BLOB";

const TABLES: &[(&str, &str)] = &[
    ("users", "name TEXT, surname TEXT, email TEXT, valid INTEGER"),
    (
        "groups",
        "name TEXT, name_en TEXT, email TEXT, abbreviation TEXT, \
         grouptype_id BLOB, mastergroup_id BLOB, valid INTEGER",
    ),
    ("grouptypes", "name TEXT, name_en TEXT"),
    ("rolecategories", "name TEXT, name_en TEXT"),
    ("roletypes", "name TEXT, name_en TEXT, category_id BLOB"),
    (
        "roles",
        "user_id BLOB, group_id BLOB, roletype_id BLOB, valid INTEGER, \
         startdate TEXT, enddate TEXT",
    ),
    (
        "memberships",
        "user_id BLOB, group_id BLOB, valid INTEGER, startdate TEXT, enddate TEXT",
    ),
];

const INDEXES: &[(&str, &str)] = &[
    ("groups", "grouptype_id"),
    ("groups", "mastergroup_id"),
    ("roletypes", "category_id"),
    ("roles", "user_id"),
    ("roles", "group_id"),
    ("roles", "roletype_id"),
    ("memberships", "user_id"),
    ("memberships", "group_id"),
];

/// Create all tables and indexes.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for (table, columns) in TABLES {
        let ddl = format!("CREATE TABLE IF NOT EXISTS {} ({}, {})", table, AUDIT, columns);
        sqlx::query(&ddl).execute(pool).await?;
    }

    for (table, column) in INDEXES {
        let ddl = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table} ({column})",
            table = table,
            column = column
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    info!(tables = TABLES.len(), indexes = INDEXES.len(), "Schema initialized");
    Ok(())
}
