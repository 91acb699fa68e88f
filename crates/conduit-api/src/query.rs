//! Read queries against resource collections.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::spec::SortField;

/// One stage of a [`Query`], applied in sequence by the executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum QueryStep {
    /// Keep rows whose fields equal every given value.
    Filter { fields: Map<String, Value> },
    Sort { fields: Vec<SortField> },
    /// Attach related rows under each relationship name.
    Load { relationships: Vec<String> },
    Limit { count: usize },
}

/// An ordered pipeline of [`QueryStep`]s.
///
/// Only [`QueryBuilder`] constructs queries, so the steps always appear as
/// filter, sort, load, limit, each at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Query {
    steps: Vec<QueryStep>,
}

impl Query {
    pub fn steps(&self) -> &[QueryStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Collects the optional parts of a query in any order and emits them in
/// the fixed order filter, sort, load, limit.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    filter: Option<Map<String, Value>>,
    sort: Option<Vec<SortField>>,
    load: Option<Vec<String>>,
    limit: Option<usize>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, fields: Option<Map<String, Value>>) -> Self {
        self.filter = fields;
        self
    }

    #[must_use]
    pub fn sort(mut self, fields: Option<Vec<SortField>>) -> Self {
        self.sort = fields;
        self
    }

    #[must_use]
    pub fn load(mut self, relationships: Option<Vec<String>>) -> Self {
        self.load = relationships;
        self
    }

    #[must_use]
    pub fn limit(mut self, count: Option<usize>) -> Self {
        self.limit = count;
        self
    }

    pub fn build(self) -> Query {
        let mut steps = Vec::with_capacity(4);
        if let Some(fields) = self.filter {
            steps.push(QueryStep::Filter { fields });
        }
        if let Some(fields) = self.sort {
            steps.push(QueryStep::Sort { fields });
        }
        if let Some(relationships) = self.load {
            steps.push(QueryStep::Load { relationships });
        }
        if let Some(count) = self.limit {
            steps.push(QueryStep::Limit { count });
        }
        Query { steps }
    }
}
