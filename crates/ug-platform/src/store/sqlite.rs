//! SQLite Entity Store Implementation
//!
//! One generic repository serves every entity kind; SQL is generated from
//! the column metadata of the entity type.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::query::QueryAs;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::entity::{all_columns, column, Entity, InsertInput, SqlValue, UpdateInput};
use super::filter::WhereFilter;
use super::{next_token, EntityStore, UpdateOutcome};
use crate::shared::error::Result;

/// SQLite implementation of [`EntityStore`] for entity `E`
pub struct SqlStore<E> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqlStore<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// Comma separated list of every column, used for SELECT and RETURNING
    fn select_list() -> String {
        all_columns::<E>()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Build the appropriate number of placeholders for an IN clause
    fn build_in_clause(count: usize) -> String {
        let placeholders: Vec<&str> = (0..count).map(|_| "?").collect();
        placeholders.join(", ")
    }

    async fn count_by_id(&self, id: Uuid) -> Result<i64> {
        let query = format!("SELECT COUNT(*) FROM {} WHERE id = ?", E::KIND.table());
        let (count,): (i64,) = sqlx::query_as(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Bind generated values in order.
fn bind_values<'q, O>(
    mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    values: Vec<SqlValue>,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Real(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Uuid(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
        };
    }
    query
}

#[async_trait]
impl<E: Entity> EntityStore<E> for SqlStore<E> {
    async fn fetch_by_ids(&self, ids: &[Uuid]) -> Result<Vec<E>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {} FROM {} WHERE id IN ({})",
            Self::select_list(),
            E::KIND.table(),
            Self::build_in_clause(ids.len())
        );

        let mut q = sqlx::query_as::<_, E>(&query);
        for id in ids {
            q = q.bind(*id);
        }
        let rows = q.fetch_all(&self.pool).await?;

        debug!(kind = %E::KIND, requested = ids.len(), found = rows.len(), "Fetched by ids");
        Ok(rows)
    }

    async fn filter_by(&self, field: &str, value: SqlValue) -> Result<Vec<E>> {
        let filter = WhereFilter::eq::<E>(field, value)?;
        let mut binds = Vec::new();
        let query = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY rowid",
            Self::select_list(),
            E::KIND.table(),
            filter.to_sql(&mut binds)
        );

        let rows = bind_values(sqlx::query_as::<_, E>(&query), binds)
            .fetch_all(&self.pool)
            .await?;

        debug!(kind = %E::KIND, field = %field, count = rows.len(), "Filtered rows");
        Ok(rows)
    }

    async fn page(&self, skip: i64, limit: i64, filter: Option<&WhereFilter>) -> Result<Vec<E>> {
        let mut binds = Vec::new();
        let where_clause = filter
            .map(|f| format!(" WHERE {}", f.to_sql(&mut binds)))
            .unwrap_or_default();
        binds.push(SqlValue::Int(limit));
        binds.push(SqlValue::Int(skip));

        let query = format!(
            "SELECT {} FROM {}{} ORDER BY rowid LIMIT ? OFFSET ?",
            Self::select_list(),
            E::KIND.table(),
            where_clause
        );

        let rows = bind_values(sqlx::query_as::<_, E>(&query), binds)
            .fetch_all(&self.pool)
            .await?;

        debug!(kind = %E::KIND, skip, limit, count = rows.len(), "Fetched page");
        Ok(rows)
    }

    async fn insert(&self, id: Uuid, now: DateTime<Utc>, input: &E::Insert) -> Result<E> {
        let mut names = vec!["id", "created", "lastchange", "createdby", "changedby"];
        let mut binds = vec![
            SqlValue::Uuid(id),
            SqlValue::Timestamp(now),
            SqlValue::Timestamp(now),
            input.createdby().into(),
            input.createdby().into(),
        ];
        for (name, value) in input.values() {
            names.push(column::<E>(name)?.name);
            binds.push(value);
        }

        let query = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            E::KIND.table(),
            names.join(", "),
            Self::build_in_clause(names.len()),
            Self::select_list()
        );

        let row = bind_values(sqlx::query_as::<_, E>(&query), binds)
            .fetch_one(&self.pool)
            .await?;

        debug!(kind = %E::KIND, id = %id, "Inserted row");
        Ok(row)
    }

    async fn update(&self, now: DateTime<Utc>, input: &E::Update) -> Result<UpdateOutcome<E>> {
        let id = input.id();
        let mut assignments = vec!["lastchange = ?".to_string(), "changedby = ?".to_string()];
        let token = next_token(now, input.lastchange());
        let mut binds = vec![SqlValue::Timestamp(token), input.changedby().into()];
        for (name, value) in input.values() {
            assignments.push(format!("{} = ?", column::<E>(name)?.name));
            binds.push(value);
        }
        binds.push(SqlValue::Uuid(id));
        binds.push(SqlValue::Timestamp(input.lastchange()));

        let query = format!(
            "UPDATE {} SET {} WHERE id = ? AND lastchange = ? RETURNING {}",
            E::KIND.table(),
            assignments.join(", "),
            Self::select_list()
        );

        let updated = bind_values(sqlx::query_as::<_, E>(&query), binds)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = updated {
            debug!(kind = %E::KIND, id = %id, "Updated row");
            return Ok(UpdateOutcome::Updated(row));
        }

        if self.count_by_id(id).await? == 0 {
            debug!(kind = %E::KIND, id = %id, "Update target not found");
            Ok(UpdateOutcome::NotFound)
        } else {
            debug!(kind = %E::KIND, id = %id, "Update rejected, stale lastchange");
            Ok(UpdateOutcome::Conflict)
        }
    }
}
