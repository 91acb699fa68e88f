//! In-memory [`QueryExecutor`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use conduit_api::{Query, QueryError, QueryExecutor, QueryStep, SortDirection, SortField};
use serde_json::{Map, Value};

/// `resource.source_field == target.target_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub target: String,
    pub source_field: String,
    pub target_field: String,
}

/// Rows held per resource id, queried by applying the query's steps in order.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryExecutor {
    resources: BTreeMap<String, Vec<Value>>,
    relationships: BTreeMap<(String, String), Relationship>,
}

impl MemoryQueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_resource(mut self, resource_id: impl Into<String>, rows: Vec<Value>) -> Self {
        self.resources.insert(resource_id.into(), rows);
        self
    }

    #[must_use]
    pub fn with_relationship(
        mut self,
        resource_id: impl Into<String>,
        name: impl Into<String>,
        relationship: Relationship,
    ) -> Self {
        self.relationships
            .insert((resource_id.into(), name.into()), relationship);
        self
    }

    pub fn has_resource(&self, resource_id: &str) -> bool {
        self.resources.contains_key(resource_id)
    }

    fn load(
        &self,
        resource_id: &str,
        rows: &mut [Value],
        relationships: &[String],
    ) -> Result<(), QueryError> {
        for name in relationships {
            let relationship = self
                .relationships
                .get(&(resource_id.to_string(), name.clone()))
                .ok_or_else(|| QueryError::UnknownRelationship {
                    resource: resource_id.to_string(),
                    relationship: name.clone(),
                })?;
            let targets = self
                .resources
                .get(&relationship.target)
                .ok_or_else(|| QueryError::UnknownResource(relationship.target.clone()))?;

            for row in rows.iter_mut() {
                let Value::Object(fields) = row else {
                    continue;
                };
                let related: Vec<Value> = match fields.get(&relationship.source_field) {
                    Some(key) if !key.is_null() => targets
                        .iter()
                        .filter(|t| t.get(&relationship.target_field) == Some(key))
                        .cloned()
                        .collect(),
                    _ => Vec::new(),
                };
                fields.insert(name.clone(), Value::Array(related));
            }
        }
        Ok(())
    }
}

impl QueryExecutor for MemoryQueryExecutor {
    fn execute(&self, resource_id: &str, query: &Query) -> Result<Vec<Value>, QueryError> {
        let mut rows = self
            .resources
            .get(resource_id)
            .cloned()
            .ok_or_else(|| QueryError::UnknownResource(resource_id.to_string()))?;

        for step in query.steps() {
            match step {
                QueryStep::Filter { fields } => rows.retain(|row| matches_filter(row, fields)),
                QueryStep::Sort { fields } => rows.sort_by(|a, b| compare_rows(a, b, fields)),
                QueryStep::Load { relationships } => {
                    self.load(resource_id, &mut rows, relationships)?;
                }
                QueryStep::Limit { count } => rows.truncate(*count),
            }
        }
        Ok(rows)
    }
}

fn matches_filter(row: &Value, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(field, expected)| row.get(field) == Some(expected))
}

fn compare_rows(a: &Value, b: &Value, fields: &[SortField]) -> Ordering {
    for sort in fields {
        let ordering = compare_values(a.get(&sort.field), b.get(&sort.field));
        let ordering = match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Total order over JSON values: missing and null first, then booleans,
/// numbers, strings, arrays and objects.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = (a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null));
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_api::QueryBuilder;
    use serde_json::json;

    fn executor() -> MemoryQueryExecutor {
        MemoryQueryExecutor::new()
            .with_resource(
                "users",
                vec![
                    json!({"id": 1, "name": "Grace", "age": 85, "active": true}),
                    json!({"id": 2, "name": "Ada", "age": 36, "active": true}),
                    json!({"id": 3, "name": "Edsger", "active": false}),
                    json!({"id": 4, "name": "Barbara", "age": 36, "active": true}),
                ],
            )
            .with_resource(
                "orders",
                vec![
                    json!({"id": 10, "user_id": 2}),
                    json!({"id": 11, "user_id": 1}),
                    json!({"id": 12, "user_id": 2}),
                ],
            )
            .with_relationship(
                "users",
                "orders",
                Relationship {
                    target: "orders".to_string(),
                    source_field: "id".to_string(),
                    target_field: "user_id".to_string(),
                },
            )
    }

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    fn active() -> Option<Map<String, Value>> {
        let mut filter = Map::new();
        filter.insert("active".to_string(), json!(true));
        Some(filter)
    }

    #[test]
    fn filter_sort_limit() {
        let query = QueryBuilder::new()
            .filter(active())
            .sort(Some(vec![SortField::asc("age"), SortField::desc("name")]))
            .limit(Some(2))
            .build();
        let rows = executor().execute("users", &query).unwrap();
        assert_eq!(ids(&rows), vec![4, 2]);
    }

    #[test]
    fn limit_applies_after_sort() {
        let query = QueryBuilder::new()
            .sort(Some(vec![SortField::asc("name")]))
            .limit(Some(1))
            .build();
        let rows = executor().execute("users", &query).unwrap();
        assert_eq!(rows[0]["name"], json!("Ada"));
    }

    #[test]
    fn missing_sort_field_sorts_first() {
        let query = QueryBuilder::new()
            .sort(Some(vec![SortField::asc("age")]))
            .build();
        let rows = executor().execute("users", &query).unwrap();
        assert_eq!(ids(&rows), vec![3, 2, 4, 1]);
    }

    #[test]
    fn load_attaches_related_rows() {
        let query = QueryBuilder::new()
            .filter(active())
            .load(Some(vec!["orders".to_string()]))
            .build();
        let rows = executor().execute("users", &query).unwrap();
        let ada = rows.iter().find(|r| r["id"] == json!(2)).unwrap();
        assert_eq!(ids(ada["orders"].as_array().unwrap()), vec![10, 12]);
        let barbara = rows.iter().find(|r| r["id"] == json!(4)).unwrap();
        assert_eq!(barbara["orders"], json!([]));
    }

    #[test]
    fn unknown_names_fail() {
        let err = executor()
            .execute("ghosts", &QueryBuilder::new().build())
            .unwrap_err();
        assert_eq!(err, QueryError::UnknownResource("ghosts".to_string()));

        let query = QueryBuilder::new()
            .load(Some(vec!["pets".to_string()]))
            .build();
        let err = executor().execute("users", &query).unwrap_err();
        assert!(matches!(err, QueryError::UnknownRelationship { relationship, .. } if relationship == "pets"));
    }
}
