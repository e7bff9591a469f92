//! Structured `where` filters
//!
//! Filters arrive as JSON in the shape
//! `{"name": {"_eq": "x"}, "_or": [{"valid": {"_eq": true}}, ...]}`.
//! Keys of one object are joined with AND; `_and` / `_or` take arrays of
//! nested filter objects. Field names are checked against the entity's
//! column whitelist before any SQL is generated.

use serde_json::{Map, Value};

use super::entity::{column, Entity, SqlValue};
use super::MAX_BIND_PARAMETERS;
use crate::shared::error::{PlatformError, Result};

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    ILike,
    In,
}

impl Operator {
    fn parse(name: &str) -> Result<Self> {
        Ok(match name {
            "_eq" => Operator::Eq,
            "_neq" => Operator::Neq,
            "_lt" => Operator::Lt,
            "_le" => Operator::Le,
            "_gt" => Operator::Gt,
            "_ge" => Operator::Ge,
            "_like" => Operator::Like,
            "_ilike" => Operator::ILike,
            "_in" => Operator::In,
            other => {
                return Err(PlatformError::validation(format!(
                    "Unknown filter operator '{}'",
                    other
                )))
            }
        })
    }
}

/// Values one filter may bind; paging appends `LIMIT ? OFFSET ?`.
pub const MAX_FILTER_VALUES: usize = MAX_BIND_PARAMETERS - 2;

#[derive(Debug, Clone, PartialEq)]
pub enum WhereFilter {
    And(Vec<WhereFilter>),
    Or(Vec<WhereFilter>),
    Condition {
        field: &'static str,
        op: Operator,
        values: Vec<SqlValue>,
    },
}

impl WhereFilter {
    /// Equality on a single field.
    pub fn eq<E: Entity>(field: &str, value: impl Into<SqlValue>) -> Result<Self> {
        Ok(WhereFilter::Condition {
            field: column::<E>(field)?.name,
            op: Operator::Eq,
            values: vec![value.into()],
        })
    }

    /// Case-insensitive pattern match on a single field.
    pub fn ilike<E: Entity>(field: &str, pattern: impl Into<String>) -> Result<Self> {
        Ok(WhereFilter::Condition {
            field: column::<E>(field)?.name,
            op: Operator::ILike,
            values: vec![SqlValue::Text(pattern.into())],
        })
    }

    /// Parse and validate a JSON filter for entity `E`.
    pub fn from_json<E: Entity>(value: &Value) -> Result<Self> {
        let filter = match value {
            Value::Object(map) => Self::from_object::<E>(map)?,
            _ => return Err(PlatformError::validation("where filter must be a JSON object")),
        };
        let count = filter.value_count();
        if count > MAX_FILTER_VALUES {
            return Err(PlatformError::validation(format!(
                "where filter binds {} values, at most {} allowed",
                count, MAX_FILTER_VALUES
            )));
        }
        Ok(filter)
    }

    /// Number of placeholders [`WhereFilter::to_sql`] will bind.
    pub fn value_count(&self) -> usize {
        match self {
            WhereFilter::And(parts) | WhereFilter::Or(parts) => {
                parts.iter().map(WhereFilter::value_count).sum()
            }
            WhereFilter::Condition { values, .. } => values.len(),
        }
    }

    /// Parse the `where` query parameter.
    pub fn parse<E: Entity>(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| PlatformError::validation(format!("Invalid where filter: {}", e)))?;
        Self::from_json::<E>(&value)
    }

    fn from_object<E: Entity>(map: &Map<String, Value>) -> Result<Self> {
        let mut parts = Vec::with_capacity(map.len());

        for (key, value) in map {
            match key.as_str() {
                "_and" => parts.push(WhereFilter::And(Self::from_array::<E>(key, value)?)),
                "_or" => parts.push(WhereFilter::Or(Self::from_array::<E>(key, value)?)),
                field => {
                    let column = column::<E>(field)?;
                    let ops = value.as_object().ok_or_else(|| {
                        PlatformError::validation(format!(
                            "Filter on '{}' must be an object of operators",
                            field
                        ))
                    })?;

                    for (op_name, operand) in ops {
                        let op = Operator::parse(op_name)?;
                        let values = match (op, operand) {
                            (Operator::In, Value::Array(items))
                                if items.len() > MAX_FILTER_VALUES =>
                            {
                                return Err(PlatformError::validation(format!(
                                    "_in on '{}' takes at most {} values, got {}",
                                    field,
                                    MAX_FILTER_VALUES,
                                    items.len()
                                )))
                            }
                            (Operator::In, Value::Array(items)) => items
                                .iter()
                                .map(|item| SqlValue::from_json(column, item))
                                .collect::<Result<Vec<_>>>()?,
                            (Operator::In, _) => {
                                return Err(PlatformError::validation(format!(
                                    "_in on '{}' requires an array",
                                    field
                                )))
                            }
                            (_, operand) => vec![SqlValue::from_json(column, operand)?],
                        };
                        parts.push(WhereFilter::Condition {
                            field: column.name,
                            op,
                            values,
                        });
                    }
                }
            }
        }

        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => WhereFilter::And(parts),
        })
    }

    fn from_array<E: Entity>(key: &str, value: &Value) -> Result<Vec<WhereFilter>> {
        value
            .as_array()
            .ok_or_else(|| PlatformError::validation(format!("{} requires an array", key)))?
            .iter()
            .map(Self::from_json::<E>)
            .collect()
    }

    /// Render as a SQL boolean expression, pushing bind values in order.
    pub fn to_sql(&self, binds: &mut Vec<SqlValue>) -> String {
        match self {
            WhereFilter::And(parts) => Self::join(parts, " AND ", "1 = 1", binds),
            WhereFilter::Or(parts) => Self::join(parts, " OR ", "1 = 0", binds),
            WhereFilter::Condition { field, op, values } => {
                let sql = match op {
                    Operator::Eq if values.first() == Some(&SqlValue::Null) => {
                        return format!("{} IS NULL", field)
                    }
                    Operator::Neq if values.first() == Some(&SqlValue::Null) => {
                        return format!("{} IS NOT NULL", field)
                    }
                    Operator::In if values.is_empty() => return "1 = 0".to_string(),
                    Operator::Eq => format!("{} = ?", field),
                    Operator::Neq => format!("{} <> ?", field),
                    Operator::Lt => format!("{} < ?", field),
                    Operator::Le => format!("{} <= ?", field),
                    Operator::Gt => format!("{} > ?", field),
                    Operator::Ge => format!("{} >= ?", field),
                    Operator::Like => format!("{} LIKE ?", field),
                    Operator::ILike => format!("lower({}) LIKE lower(?)", field),
                    Operator::In => {
                        let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
                        format!("{} IN ({})", field, placeholders.join(", "))
                    }
                };
                binds.extend(values.iter().cloned());
                sql
            }
        }
    }

    fn join(parts: &[WhereFilter], sep: &str, empty: &str, binds: &mut Vec<SqlValue>) -> String {
        if parts.is_empty() {
            return empty.to_string();
        }
        let rendered: Vec<String> = parts
            .iter()
            .map(|part| format!("({})", part.to_sql(binds)))
            .collect();
        rendered.join(sep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::entity::User;
    use serde_json::json;

    #[test]
    fn test_simple_condition() {
        let filter = WhereFilter::from_json::<User>(&json!({"name": {"_eq": "Jan"}})).unwrap();
        let mut binds = Vec::new();
        assert_eq!(filter.to_sql(&mut binds), "name = ?");
        assert_eq!(binds, vec![SqlValue::Text("Jan".into())]);
    }

    #[test]
    fn test_or_of_ilike() {
        let filter = WhereFilter::from_json::<User>(&json!({
            "_or": [
                {"name": {"_ilike": "%ja%"}},
                {"email": {"_ilike": "%ja%"}}
            ]
        }))
        .unwrap();
        let mut binds = Vec::new();
        assert_eq!(
            filter.to_sql(&mut binds),
            "(lower(name) LIKE lower(?)) OR (lower(email) LIKE lower(?))"
        );
        assert_eq!(binds.len(), 2);
    }

    #[test]
    fn test_in_and_null() {
        let a = uuid::Uuid::new_v4();
        let filter = WhereFilter::from_json::<User>(&json!({
            "id": {"_in": [a.to_string()]},
            "email": {"_eq": null}
        }))
        .unwrap();
        let mut binds = Vec::new();
        let sql = filter.to_sql(&mut binds);
        assert!(sql.contains("id IN (?)"));
        assert!(sql.contains("email IS NULL"));
        assert_eq!(binds, vec![SqlValue::Uuid(a)]);
    }

    #[test]
    fn test_value_count_is_capped() {
        let ids: Vec<String> = (0..=MAX_FILTER_VALUES)
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect();
        let err = WhereFilter::from_json::<User>(&json!({"id": {"_in": ids}})).unwrap_err();
        assert!(matches!(err, PlatformError::Validation { .. }));

        // Two lists that fit alone but not together
        let half: Vec<String> = (0..MAX_FILTER_VALUES / 2 + 1)
            .map(|i| format!("user{}", i))
            .collect();
        let err = WhereFilter::from_json::<User>(&json!({
            "_or": [{"name": {"_in": half}}, {"email": {"_in": half}}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlatformError::Validation { .. }));

        let filter = WhereFilter::from_json::<User>(&json!({
            "name": {"_in": ["a", "b"]},
            "valid": {"_eq": true}
        }))
        .unwrap();
        assert_eq!(filter.value_count(), 3);
    }

    #[test]
    fn test_rejects_unknown_fields_and_operators() {
        assert!(WhereFilter::from_json::<User>(&json!({"password": {"_eq": "x"}})).is_err());
        assert!(WhereFilter::from_json::<User>(&json!({"name": {"_regex": "x"}})).is_err());
        assert!(WhereFilter::from_json::<User>(&json!({"name": "x"})).is_err());
        assert!(WhereFilter::from_json::<User>(&json!({"id": {"_in": "x"}})).is_err());
        assert!(WhereFilter::parse::<User>("{not json").is_err());
    }
}
