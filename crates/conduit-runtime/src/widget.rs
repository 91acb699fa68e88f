//! Default lifecycle behavior for widget types.

use conduit_api::{ConduitError, ConnectionSpec, Effect, ResolvedState, SessionContext};
use tracing::debug;

use crate::binding::Binding;

/// Apply resolver effects to the session's pub/sub client, in order.
///
/// Without a client the effects are dropped; a session with no pub/sub
/// cannot have registered anything to release.
pub fn apply_effects(context: &SessionContext, effects: &[Effect]) {
    let Some(pubsub) = context.pubsub.as_deref() else {
        if !effects.is_empty() {
            debug!(count = effects.len(), "no pub/sub client, dropping effects");
        }
        return;
    };
    for effect in effects {
        match effect {
            Effect::Subscribe(topic) => pubsub.subscribe(topic),
            Effect::Unsubscribe(topic) => pubsub.unsubscribe(topic),
        }
    }
}

/// A widget whose data comes from a [`ConnectionSpec`].
///
/// Implementors only expose their [`Binding`]; mounting, updating and
/// teardown are provided and call [`BoundWidget::on_resolved`] whenever
/// new state is committed.
pub trait BoundWidget {
    fn binding(&self) -> &Binding;
    fn binding_mut(&mut self) -> &mut Binding;

    /// Merge freshly resolved state into render-visible fields.
    fn on_resolved(&mut self, _state: &ResolvedState) {}

    fn mount(&mut self, context: &SessionContext) -> Result<(), ConduitError> {
        let effects = self.binding_mut().mount(context)?;
        settle(self, context, &effects);
        Ok(())
    }

    fn update(
        &mut self,
        spec: ConnectionSpec,
        context: &SessionContext,
    ) -> Result<(), ConduitError> {
        let revision = self.binding().revision();
        let effects = self.binding_mut().update(spec, context)?;
        apply_effects(context, &effects);
        if self.binding().revision() != revision {
            let state = self.binding().state().clone();
            self.on_resolved(&state);
        }
        Ok(())
    }

    fn refresh(&mut self, context: &SessionContext) -> Result<(), ConduitError> {
        let effects = self.binding_mut().refresh(context)?;
        settle(self, context, &effects);
        Ok(())
    }

    fn teardown(&mut self, context: &SessionContext) -> Result<(), ConduitError> {
        let effects = self.binding_mut().teardown()?;
        apply_effects(context, &effects);
        Ok(())
    }
}

fn settle<W: BoundWidget + ?Sized>(widget: &mut W, context: &SessionContext, effects: &[Effect]) {
    apply_effects(context, effects);
    let state = widget.binding().state().clone();
    widget.on_resolved(&state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use conduit_connectors::{MemoryQueryExecutor, RecordingPubSub};
    use serde_json::{Value, json};

    /// A table that renders whatever rows its connection yields.
    struct Table {
        binding: Binding,
        rows: Vec<Value>,
        renders: usize,
    }

    impl Table {
        fn new(spec: ConnectionSpec) -> Self {
            Self {
                binding: Binding::new("table", spec),
                rows: Vec::new(),
                renders: 0,
            }
        }
    }

    impl BoundWidget for Table {
        fn binding(&self) -> &Binding {
            &self.binding
        }

        fn binding_mut(&mut self) -> &mut Binding {
            &mut self.binding
        }

        fn on_resolved(&mut self, state: &ResolvedState) {
            self.renders += 1;
            self.rows = state
                .data
                .as_ref()
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
        }
    }

    fn session(pubsub: &Arc<RecordingPubSub>) -> SessionContext {
        let executor = MemoryQueryExecutor::new()
            .with_resource("users", vec![json!({"id": 1}), json!({"id": 2})]);
        SessionContext::detached(Arc::new(executor))
            .with_domain(Arc::new(conduit_connectors::FunctionRegistry::new()))
            .with_pubsub(pubsub.clone())
            .connected(true)
    }

    #[test]
    fn widget_gets_rows_through_default_lifecycle() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let ctx = session(&pubsub);
        let mut table = Table::new(ConnectionSpec::resource("users"));

        table.mount(&ctx).unwrap();
        assert_eq!(table.rows.len(), 2);

        table.update(ConnectionSpec::resource("users"), &ctx).unwrap();
        assert_eq!(table.renders, 1);

        table
            .update(
                ConnectionSpec::ResourceQuery {
                    resource_id: "users".to_string(),
                    filter: None,
                    sort: None,
                    load: None,
                    limit: Some(1),
                },
                &ctx,
            )
            .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.renders, 2);
    }

    #[test]
    fn teardown_releases_subscription() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let ctx = session(&pubsub);
        let mut table = Table::new(ConnectionSpec::subscription("users"));

        table.mount(&ctx).unwrap();
        assert_eq!(pubsub.live_topics(), vec!["users"]);

        table.teardown(&ctx).unwrap();
        assert!(pubsub.live_topics().is_empty());
        assert_eq!(
            pubsub.events(),
            vec![
                Effect::Subscribe("users".to_string()),
                Effect::Unsubscribe("users".to_string()),
            ]
        );
        assert!(table.teardown(&ctx).is_err());
    }
}
