//! conduit-api
//!
//! Shared vocabulary for the conduit connection resolution engine:
//!
//! - [`ConnectionSpec`], the closed set of data-source descriptors a widget declares
//! - [`ResolvedState`] and [`Resolution`], what resolving a descriptor produces
//! - the collaborator traits a host session injects through [`SessionContext`]
//!   ([`DomainHandle`], [`QueryExecutor`], [`PubSubClient`])
//! - [`ConduitError`], the error type for host and configuration failures
//!
//! Resolution failures are not `Err` values; they travel inside
//! [`ResolvedState::error`] as an [`ErrorInfo`].

#![forbid(unsafe_code)]

mod error;
mod fixture;
mod form;
mod lifecycle;
mod query;
mod session;
mod spec;
mod state;

pub use error::{ConduitError, InvocationError, QueryError};
pub use fixture::{
    ActionFixture, DomainFixture, FunctionFixture, RelationshipFixture, SessionFixture,
};
pub use form::{FieldErrors, FormHandle, FormTarget};
pub use lifecycle::{InstanceSummary, LifecycleState};
pub use query::{Query, QueryBuilder, QueryStep};
pub use session::{DomainHandle, PubSubClient, QueryExecutor, SessionContext, SessionFactory};
pub use spec::{ConnectionKind, ConnectionSpec, Mode, SortDirection, SortField};
pub use state::{
    ActionConfig, Effect, ErrorInfo, ErrorKind, Resolution, ResolvedState, Snapshot, StreamRef,
};

pub type InstanceId = String;
