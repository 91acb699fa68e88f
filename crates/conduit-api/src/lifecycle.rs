use std::fmt;

use serde::{Deserialize, Serialize};

use crate::spec::{ConnectionKind, Mode};
use crate::state::ErrorKind;

/// Where a widget instance is in its binding lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Resolving,
    Resolved,
    TornDown,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Resolving => "resolving",
            LifecycleState::Resolved => "resolved",
            LifecycleState::TornDown => "torn_down",
        })
    }
}

/// Per-instance diagnostic line: what the widget is bound to and how it is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: String,
    pub widget_type: String,
    pub kind: ConnectionKind,
    pub mode: Mode,
    pub lifecycle: LifecycleState,
    pub error: Option<ErrorKind>,
    pub subscription_topic: Option<String>,
    pub revision: u64,
}
