//! Serializable description of a session, used to assemble collaborators
//! for diagnostics and tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFixture {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub domain: Option<DomainFixture>,
    /// Rows per resource id.
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    pub relationships: Vec<RelationshipFixture>,
    /// Initial items per stream name.
    #[serde(default)]
    pub streams: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainFixture {
    #[serde(default)]
    pub functions: Vec<FunctionFixture>,
    #[serde(default)]
    pub actions: Vec<ActionFixture>,
}

/// A domain function with a canned outcome: `error` wins over `result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionFixture {
    pub name: String,
    #[serde(default)]
    pub arity: usize,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionFixture {
    pub resource_id: String,
    pub action: String,
    #[serde(default)]
    pub required: Vec<String>,
}

/// `resource.source_field == target.target_field`, loaded under `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipFixture {
    pub resource: String,
    pub name: String,
    pub target: String,
    pub source_field: String,
    pub target_field: String,
}
