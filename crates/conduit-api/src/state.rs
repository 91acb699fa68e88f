//! Resolution output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::form::FormHandle;
use crate::spec::ConnectionSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The domain handle has no function with that name and arity.
    FunctionNotFound,
    /// The function was found but raised a failure.
    InvocationFailed,
    /// The query executor rejected or failed the query.
    QueryFailed,
    /// Malformed payload, or a session that lacks a capability the spec needs.
    InvalidSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn function_not_found(name: &str, arity: usize) -> Self {
        Self::new(
            ErrorKind::FunctionNotFound,
            format!("no function {name}/{arity} on the domain handle"),
        )
    }

    pub fn invocation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvocationFailed, message)
    }

    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QueryFailed, message)
    }

    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSpec, message)
    }
}

/// Binding to a host-maintained stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRef {
    pub name: String,
}

/// A pending command, executed later by a user event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub action: String,
    pub record_ref: Value,
}

/// Render-ready state for one widget.
///
/// `loading` and `error` are always present; everything else depends on the
/// connection kind. A state carrying an error is never loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedState {
    pub loading: bool,
    pub error: Option<ErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_handle: Option<FormHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_handle: Option<StreamRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_config: Option<ActionConfig>,
    pub subscription_topic: Option<String>,
}

impl ResolvedState {
    /// Settled with nothing to report.
    pub fn ready() -> Self {
        Self {
            loading: false,
            error: None,
            data: None,
            form_handle: None,
            stream_handle: None,
            action_config: None,
            subscription_topic: None,
        }
    }

    /// Placeholder while a host-side capability is still running.
    pub fn pending() -> Self {
        Self {
            loading: true,
            ..Self::ready()
        }
    }

    pub fn failed(error: ErrorInfo) -> Self {
        Self {
            error: Some(error),
            ..Self::ready()
        }
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ready()
        }
    }
}

impl Default for ResolvedState {
    fn default() -> Self {
        Self::ready()
    }
}

/// A side effect the caller must apply after resolving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "effect", content = "topic", rename_all = "snake_case")]
pub enum Effect {
    Subscribe(String),
    Unsubscribe(String),
}

/// What one resolve call produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub state: ResolvedState,
    pub effects: Vec<Effect>,
}

impl Resolution {
    pub fn new(state: ResolvedState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }
}

/// The spec a state was resolved from, kept by the host for the next call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub spec: ConnectionSpec,
    pub state: ResolvedState,
}

impl Snapshot {
    pub fn new(spec: ConnectionSpec, state: ResolvedState) -> Self {
        Self { spec, state }
    }
}
