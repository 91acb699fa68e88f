mod memory;
mod pubsub;
mod registry;

use std::sync::Arc;

use conduit_api::{
    ConduitError, DomainFixture, InvocationError, PubSubClient, SessionContext, SessionFactory,
    SessionFixture,
};
use serde_json::Value;

pub use memory::{MemoryQueryExecutor, Relationship};
pub use pubsub::RecordingPubSub;
pub use registry::{ActionDef, FunctionDef, FunctionRegistry};

/// Builds in-memory collaborators from a [`SessionFixture`].
#[derive(Default)]
pub struct DefaultSessionFactory;

impl SessionFactory for DefaultSessionFactory {
    fn build(
        &self,
        fixture: &SessionFixture,
        pubsub: Arc<dyn PubSubClient>,
    ) -> Result<SessionContext, ConduitError> {
        let executor = build_executor(fixture)?;
        let mut context = SessionContext::detached(Arc::new(executor))
            .with_pubsub(pubsub)
            .connected(fixture.connected);
        if let Some(domain) = &fixture.domain {
            context = context.with_domain(Arc::new(build_registry(domain)?));
        }
        Ok(context)
    }
}

fn build_executor(fixture: &SessionFixture) -> Result<MemoryQueryExecutor, ConduitError> {
    let mut executor = fixture
        .resources
        .iter()
        .fold(MemoryQueryExecutor::new(), |executor, (id, rows)| {
            executor.with_resource(id.clone(), rows.clone())
        });

    for rel in &fixture.relationships {
        for resource in [&rel.resource, &rel.target] {
            if !executor.has_resource(resource) {
                return Err(ConduitError::Validation(format!(
                    "relationship {}.{} references missing resource {resource}",
                    rel.resource, rel.name
                )));
            }
        }
        executor = executor.with_relationship(
            rel.resource.clone(),
            rel.name.clone(),
            Relationship {
                target: rel.target.clone(),
                source_field: rel.source_field.clone(),
                target_field: rel.target_field.clone(),
            },
        );
    }
    Ok(executor)
}

fn build_registry(domain: &DomainFixture) -> Result<FunctionRegistry, ConduitError> {
    let mut registry = FunctionRegistry::new();
    for function in &domain.functions {
        if registry.contains(&function.name, function.arity) {
            return Err(ConduitError::Conflict(format!(
                "function {}/{} declared twice",
                function.name, function.arity
            )));
        }
        let outcome = match &function.error {
            Some(message) => Err(InvocationError::Failed(message.clone())),
            None => Ok(function.result.clone()),
        };
        registry.register(function.name.clone(), function.arity, move |_| {
            outcome.clone()
        });
    }
    for action in &domain.actions {
        registry.register_action(
            action.resource_id.clone(),
            action.action.clone(),
            action.required.clone(),
            |input| Ok(Value::Object(input.clone())),
        );
    }
    Ok(registry)
}
