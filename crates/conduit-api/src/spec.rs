//! Connection descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sort direction for a [`SortField`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Where a widget's data comes from.
///
/// Exactly one variant is active per widget instance and the variant never
/// changes for the lifetime of that instance; a host that receives a spec of
/// a different kind tears the instance down and creates a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionSpec {
    /// Data is passed in directly by the caller.
    Static,
    /// Call a named function on the session's domain handle.
    Interface {
        function_name: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Read rows from a named resource collection.
    ResourceQuery {
        resource_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort: Option<Vec<SortField>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        load: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    /// Bind to a host-maintained collection by name.
    Stream { stream_name: String },
    /// Editable form for a create action on a resource.
    FormCreate { resource_id: String, action: String },
    /// Editable form for an update action on an existing record.
    FormUpdate { record_ref: Value, action: String },
    /// A command against a record, executed later by a user event.
    ActionInvocation { action: String, record_ref: Value },
    /// Interest in a broadcast topic.
    Subscription { topic: String },
}

/// The tag of a [`ConnectionSpec`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Static,
    Interface,
    ResourceQuery,
    Stream,
    FormCreate,
    FormUpdate,
    ActionInvocation,
    Subscription,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 8] = [
        ConnectionKind::Static,
        ConnectionKind::Interface,
        ConnectionKind::ResourceQuery,
        ConnectionKind::Stream,
        ConnectionKind::FormCreate,
        ConnectionKind::FormUpdate,
        ConnectionKind::ActionInvocation,
        ConnectionKind::Subscription,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionKind::Static => "static",
            ConnectionKind::Interface => "interface",
            ConnectionKind::ResourceQuery => "resource_query",
            ConnectionKind::Stream => "stream",
            ConnectionKind::FormCreate => "form_create",
            ConnectionKind::FormUpdate => "form_update",
            ConnectionKind::ActionInvocation => "action_invocation",
            ConnectionKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding mode of a widget: fed by its caller or by a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Static,
    Connected,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Static => "static",
            Mode::Connected => "connected",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConnectionSpec {
    pub fn kind(&self) -> ConnectionKind {
        match self {
            ConnectionSpec::Static => ConnectionKind::Static,
            ConnectionSpec::Interface { .. } => ConnectionKind::Interface,
            ConnectionSpec::ResourceQuery { .. } => ConnectionKind::ResourceQuery,
            ConnectionSpec::Stream { .. } => ConnectionKind::Stream,
            ConnectionSpec::FormCreate { .. } => ConnectionKind::FormCreate,
            ConnectionSpec::FormUpdate { .. } => ConnectionKind::FormUpdate,
            ConnectionSpec::ActionInvocation { .. } => ConnectionKind::ActionInvocation,
            ConnectionSpec::Subscription { .. } => ConnectionKind::Subscription,
        }
    }

    /// Shorthand for an `Interface` spec.
    pub fn interface(function_name: impl Into<String>, args: Vec<Value>) -> Self {
        ConnectionSpec::Interface {
            function_name: function_name.into(),
            args,
        }
    }

    /// A `ResourceQuery` with no filter, sort, load or limit.
    pub fn resource(resource_id: impl Into<String>) -> Self {
        ConnectionSpec::ResourceQuery {
            resource_id: resource_id.into(),
            filter: None,
            sort: None,
            load: None,
            limit: None,
        }
    }

    pub fn subscription(topic: impl Into<String>) -> Self {
        ConnectionSpec::Subscription {
            topic: topic.into(),
        }
    }

    pub fn stream(stream_name: impl Into<String>) -> Self {
        ConnectionSpec::Stream {
            stream_name: stream_name.into(),
        }
    }

    /// The identity-bearing part of the payload: resource id, stream name,
    /// record identity, topic or function name. `None` for `Static`.
    ///
    /// Record identity is the record's `id` field when it has one, otherwise
    /// the whole record reference.
    pub fn key(&self) -> Option<String> {
        match self {
            ConnectionSpec::Static => None,
            ConnectionSpec::Interface { function_name, .. } => Some(function_name.clone()),
            ConnectionSpec::ResourceQuery { resource_id, .. }
            | ConnectionSpec::FormCreate { resource_id, .. } => Some(resource_id.clone()),
            ConnectionSpec::Stream { stream_name } => Some(stream_name.clone()),
            ConnectionSpec::FormUpdate { record_ref, .. }
            | ConnectionSpec::ActionInvocation { record_ref, .. } => {
                Some(record_identity(record_ref))
            }
            ConnectionSpec::Subscription { topic } => Some(topic.clone()),
        }
    }

    /// True when both specs have the same tag and the same key payload.
    pub fn same_binding(&self, other: &ConnectionSpec) -> bool {
        self.kind() == other.kind() && self.key() == other.key()
    }

    /// Checks that every required payload field is present and non-empty.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ConnectionSpec::Static => Ok(()),
            ConnectionSpec::Interface { function_name, .. } => {
                require("function_name", function_name)
            }
            ConnectionSpec::ResourceQuery {
                resource_id,
                sort,
                load,
                ..
            } => {
                require("resource_id", resource_id)?;
                if let Some(fields) = sort {
                    for field in fields {
                        require("sort.field", &field.field)?;
                    }
                }
                if let Some(relationships) = load {
                    for relationship in relationships {
                        require("load", relationship)?;
                    }
                }
                Ok(())
            }
            ConnectionSpec::Stream { stream_name } => require("stream_name", stream_name),
            ConnectionSpec::FormCreate {
                resource_id,
                action,
            } => {
                require("resource_id", resource_id)?;
                require("action", action)
            }
            ConnectionSpec::FormUpdate { record_ref, action }
            | ConnectionSpec::ActionInvocation { action, record_ref } => {
                require("action", action)?;
                if record_ref.is_null() {
                    return Err(format!("{} requires a record_ref", self.kind()));
                }
                Ok(())
            }
            ConnectionSpec::Subscription { topic } => require("topic", topic),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("missing required field `{field}`"))
    } else {
        Ok(())
    }
}

fn record_identity(record_ref: &Value) -> String {
    match record_ref.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(id) => id.to_string(),
        None => record_ref.to_string(),
    }
}
