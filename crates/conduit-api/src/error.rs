//! Error types.

use thiserror::Error;

/// Host, configuration and lifecycle failures.
///
/// Resolution failures are reported through [`crate::ErrorInfo`] instead.
#[derive(Debug, Error)]
pub enum ConduitError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict error: {0}")]
    Conflict(String),
    #[error("instance {0} has been torn down")]
    TornDown(String),
    #[error("invocation failed: {0}")]
    Invocation(#[from] InvocationError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failure raised by a domain function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    #[error("function {name}/{arity} is not registered")]
    NotFound { name: String, arity: usize },
    #[error("{0}")]
    Failed(String),
}

/// Failure reported by a query executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown resource {0}")]
    UnknownResource(String),
    #[error("resource {resource} has no relationship {relationship}")]
    UnknownRelationship {
        resource: String,
        relationship: String,
    },
    #[error("invalid query: {0}")]
    Invalid(String),
    #[error("query backend error: {0}")]
    Backend(String),
}
