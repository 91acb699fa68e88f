//! Session capabilities injected by the host.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ConduitError, InvocationError, QueryError};
use crate::fixture::SessionFixture;
use crate::form::{FieldErrors, FormTarget};
use crate::query::Query;

/// Business-logic entry points exposed to widgets.
///
/// Functions are looked up by name and arity; there is no overloading on
/// argument types.
pub trait DomainHandle: Send + Sync {
    fn has_function(&self, name: &str, arity: usize) -> bool;
    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, InvocationError>;
    fn validate_form(&self, target: &FormTarget, input: &Map<String, Value>) -> FieldErrors;
    fn submit_form(
        &self,
        target: &FormTarget,
        input: &Map<String, Value>,
    ) -> Result<Value, FieldErrors>;
}

pub trait QueryExecutor: Send + Sync {
    fn execute(&self, resource_id: &str, query: &Query) -> Result<Vec<Value>, QueryError>;
}

/// Registration side of a publish/subscribe channel. Delivery goes through
/// the host, not through this trait.
pub trait PubSubClient: Send + Sync {
    fn subscribe(&self, topic: &str);
    fn unsubscribe(&self, topic: &str);
}

/// Assembles session capabilities from a [`SessionFixture`].
pub trait SessionFactory: Send + Sync {
    fn build(
        &self,
        fixture: &SessionFixture,
        pubsub: Arc<dyn PubSubClient>,
    ) -> Result<SessionContext, ConduitError>;
}

/// Ambient capabilities of one UI session, shared read-only by every widget.
#[derive(Clone)]
pub struct SessionContext {
    pub domain: Option<Arc<dyn DomainHandle>>,
    pub connected: bool,
    pub pubsub: Option<Arc<dyn PubSubClient>>,
    pub query_executor: Arc<dyn QueryExecutor>,
}

impl SessionContext {
    /// A disconnected context with no domain and no pub/sub client, as seen
    /// during static pre-rendering.
    pub fn detached(query_executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            domain: None,
            connected: false,
            pubsub: None,
            query_executor,
        }
    }

    #[must_use]
    pub fn with_domain(mut self, domain: Arc<dyn DomainHandle>) -> Self {
        self.domain = Some(domain);
        self
    }

    #[must_use]
    pub fn with_pubsub(mut self, pubsub: Arc<dyn PubSubClient>) -> Self {
        self.pubsub = Some(pubsub);
        self
    }

    #[must_use]
    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("domain", &self.domain.is_some())
            .field("connected", &self.connected)
            .field("pubsub", &self.pubsub.is_some())
            .finish_non_exhaustive()
    }
}
