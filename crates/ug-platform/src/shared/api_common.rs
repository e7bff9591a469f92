//! Common API types and utilities

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Entity, UpdateOutcome, WhereFilter};
use crate::shared::error::Result;

mod string_or_number {
    use serde::{de, Deserialize, Deserializer};

    pub fn deserialize_i64_opt<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNum {
            Num(i64),
            Str(String),
        }

        match Option::<StringOrNum>::deserialize(deserializer)? {
            Some(StringOrNum::Num(n)) => Ok(Some(n)),
            Some(StringOrNum::Str(s)) => s.parse().map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

pub const DEFAULT_LIMIT: i64 = 10;

/// Offset paging parameters with an optional JSON `where` filter
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "string_or_number::deserialize_i64_opt")]
    skip: Option<i64>,
    #[serde(default, deserialize_with = "string_or_number::deserialize_i64_opt")]
    limit: Option<i64>,
    /// JSON encoded filter, e.g. `{"name":{"_ilike":"%ma%"}}`
    #[serde(default, rename = "where")]
    filter: Option<String>,
}

impl PageQuery {
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Parse the `where` parameter against the columns of `E`.
    pub fn filter<E: Entity>(&self) -> Result<Option<WhereFilter>> {
        match self.filter.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => WhereFilter::parse::<E>(raw).map(Some),
        }
    }
}

/// `?letters=` for the by-letters searches
#[derive(Debug, Deserialize)]
pub struct LettersQuery {
    #[serde(default)]
    pub letters: String,
    #[serde(default, deserialize_with = "string_or_number::deserialize_i64_opt")]
    limit: Option<i64>,
}

impl LettersQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

/// Result of an insert or update mutation
#[derive(Debug, Serialize)]
pub struct MutationResult<T> {
    pub id: Uuid,
    /// "ok" or "fail"
    pub msg: &'static str,
    /// Why a mutation failed: "not_found" or "conflict"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<T>,
}

impl<T> MutationResult<T> {
    pub fn ok(id: Uuid, entity: T) -> Self {
        Self {
            id,
            msg: "ok",
            reason: None,
            entity: Some(entity),
        }
    }

    pub fn fail(id: Uuid, reason: &'static str) -> Self {
        Self {
            id,
            msg: "fail",
            reason: Some(reason),
            entity: None,
        }
    }

    pub fn from_outcome(id: Uuid, outcome: UpdateOutcome<T>) -> Self {
        match outcome {
            UpdateOutcome::Updated(entity) => Self::ok(id, entity),
            UpdateOutcome::NotFound => Self::fail(id, "not_found"),
            UpdateOutcome::Conflict => Self::fail(id, "conflict"),
        }
    }
}
