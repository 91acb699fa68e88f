mod binding;
mod stream;
mod widget;

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use conduit_api::{
    ConduitError, ConnectionSpec, FieldErrors, InstanceId, InstanceSummary, InvocationError,
    LifecycleState, Resolution, ResolvedState, SessionContext, SessionFixture,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub use binding::{Binding, Commit, Ticket};
pub use stream::StreamStore;
pub use widget::{BoundWidget, apply_effects};

/// Outcome of submitting an instance's form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum FormOutcome {
    /// The record was accepted; the instance now holds a fresh form.
    Submitted(Value),
    /// The input was rejected; the instance's form carries these errors.
    Rejected(FieldErrors),
}

/// Host-side lifecycle operations for the widget instances of one session.
///
/// Calls for one instance must be serialized by the caller; calls for
/// different instances may interleave freely.
pub trait WidgetRuntime: Send + Sync {
    fn mount(
        &self,
        id: InstanceId,
        widget_type: String,
        spec: ConnectionSpec,
    ) -> Result<ResolvedState, ConduitError>;
    fn update(&self, id: &str, spec: ConnectionSpec) -> Result<ResolvedState, ConduitError>;
    fn refresh(&self, id: &str) -> Result<ResolvedState, ConduitError>;
    fn teardown(&self, id: &str) -> Result<(), ConduitError>;
    fn state(&self, id: &str) -> Result<ResolvedState, ConduitError>;
    fn lifecycle(&self, id: &str) -> Result<LifecycleState, ConduitError>;
    /// Per-instance binding overview. `revision` advances whenever what an
    /// instance shows changes, including stream contents and deliveries.
    fn modes(&self) -> Result<Vec<InstanceSummary>, ConduitError>;

    /// Record the session's connectivity. Subscriptions whose registration
    /// no longer matches are resolved again; returns how many were.
    fn set_connected(&self, connected: bool) -> Result<usize, ConduitError>;

    fn begin(&self, id: &str, spec: ConnectionSpec) -> Result<Ticket, ConduitError>;
    fn commit(
        &self,
        ticket: Ticket,
        resolution: Resolution,
    ) -> Result<Commit, ConduitError>;

    fn deliver(&self, topic: &str, payload: Value) -> Result<usize, ConduitError>;
    fn inbox(&self, id: &str) -> Result<Vec<Value>, ConduitError>;
    fn stream_insert(&self, stream: &str, item: Value) -> Result<(), ConduitError>;
    fn stream_delete(&self, stream: &str, item_id: &Value) -> Result<bool, ConduitError>;
    fn stream_items(&self, id: &str) -> Result<Vec<Value>, ConduitError>;

    fn validate_form(
        &self,
        id: &str,
        partial: &Map<String, Value>,
    ) -> Result<ResolvedState, ConduitError>;
    fn submit_form(
        &self,
        id: &str,
        input: &Map<String, Value>,
    ) -> Result<FormOutcome, ConduitError>;
    fn trigger_action(&self, id: &str) -> Result<Value, ConduitError>;
}

struct Instance {
    widget_type: String,
    binding: Binding,
    inbox: Vec<Value>,
}

#[derive(Default)]
struct HostState {
    instances: BTreeMap<InstanceId, Instance>,
    streams: StreamStore,
}

impl HostState {
    fn instance(&self, id: &str) -> Result<&Instance, ConduitError> {
        self.instances
            .get(id)
            .ok_or_else(|| ConduitError::NotFound(format!("instance {id} not mounted")))
    }

    fn instance_mut(&mut self, id: &str) -> Result<&mut Instance, ConduitError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| ConduitError::NotFound(format!("instance {id} not mounted")))
    }

    fn live(&self, id: &str) -> Result<&Instance, ConduitError> {
        let instance = self.instance(id)?;
        if instance.binding.is_torn_down() {
            return Err(ConduitError::TornDown(id.to_string()));
        }
        Ok(instance)
    }

    fn live_mut(&mut self, id: &str) -> Result<&mut Instance, ConduitError> {
        let instance = self.instance_mut(id)?;
        if instance.binding.is_torn_down() {
            return Err(ConduitError::TornDown(id.to_string()));
        }
        Ok(instance)
    }

    /// Re-resolve every live instance matching `bound` after an external
    /// change, applying the resulting effects. Returns how many were touched.
    fn invalidate(&mut self, context: &SessionContext, bound: impl Fn(&Binding) -> bool) -> usize {
        let mut effects = Vec::new();
        let mut touched = 0;
        for (id, instance) in &mut self.instances {
            let binding = &mut instance.binding;
            if binding.is_torn_down() || !bound(binding) {
                continue;
            }
            debug!(instance = %id, "invalidating resolved state");
            match binding.invalidate(context) {
                Ok(applied) => {
                    effects.extend(applied);
                    touched += 1;
                }
                Err(err) => debug!(instance = %id, error = %err, "refresh skipped"),
            }
        }
        apply_effects(context, &effects);
        touched
    }
}

/// Widget host for one UI session.
///
/// Lock order is the instance table first, then the session context.
pub struct ConduitRuntime {
    context: RwLock<SessionContext>,
    state: RwLock<HostState>,
}

impl ConduitRuntime {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context: RwLock::new(context),
            state: RwLock::new(HostState::default()),
        }
    }

    /// Runtime whose streams start with the fixture's items.
    pub fn with_fixture(context: SessionContext, fixture: &SessionFixture) -> Self {
        let mut host = HostState::default();
        for (name, items) in &fixture.streams {
            host.streams.seed(name.clone(), items.clone());
        }
        Self {
            context: RwLock::new(context),
            state: RwLock::new(host),
        }
    }

    /// The session context lifecycle calls currently resolve against.
    pub fn context(&self) -> Result<SessionContext, ConduitError> {
        self.context
            .read()
            .map(|context| context.clone())
            .map_err(|_| ConduitError::Internal("session context poisoned".to_string()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HostState>, ConduitError> {
        self.state
            .read()
            .map_err(|_| ConduitError::Internal("runtime state poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HostState>, ConduitError> {
        self.state
            .write()
            .map_err(|_| ConduitError::Internal("runtime state poisoned".to_string()))
    }
}

/// Run a domain call made on behalf of an instance, turning a panic into an
/// invocation error so the instance table stays usable.
fn shielded<T>(id: &str, call: impl FnOnce() -> T) -> Result<T, ConduitError> {
    panic::catch_unwind(AssertUnwindSafe(call)).map_err(|_| {
        warn!(instance = %id, "domain call panicked");
        ConduitError::Invocation(InvocationError::Failed(format!(
            "domain call for instance {id} panicked"
        )))
    })
}

impl WidgetRuntime for ConduitRuntime {
    fn mount(
        &self,
        id: InstanceId,
        widget_type: String,
        spec: ConnectionSpec,
    ) -> Result<ResolvedState, ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        if host
            .instances
            .get(&id)
            .is_some_and(|existing| !existing.binding.is_torn_down())
        {
            return Err(ConduitError::Conflict(format!(
                "instance {id} is already mounted"
            )));
        }

        // A torn-down binding is renewed so its generation keeps counting.
        let mut binding = match host.instances.remove(&id) {
            Some(previous) => {
                let mut binding = previous.binding;
                binding.renew(spec);
                binding
            }
            None => Binding::new(id.clone(), spec),
        };
        let effects = binding.mount(&context)?;
        let state = binding.state().clone();
        host.instances.insert(
            id,
            Instance {
                widget_type,
                binding,
                inbox: Vec::new(),
            },
        );
        apply_effects(&context, &effects);
        Ok(state)
    }

    fn update(&self, id: &str, spec: ConnectionSpec) -> Result<ResolvedState, ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        let instance = host.instance_mut(id)?;
        let recreated = spec.kind() != instance.binding.spec().kind();
        let effects = instance.binding.update(spec, &context)?;
        if recreated {
            instance.inbox.clear();
        }
        apply_effects(&context, &effects);
        Ok(instance.binding.state().clone())
    }

    fn refresh(&self, id: &str) -> Result<ResolvedState, ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        let instance = host.instance_mut(id)?;
        let effects = instance.binding.refresh(&context)?;
        apply_effects(&context, &effects);
        Ok(instance.binding.state().clone())
    }

    fn teardown(&self, id: &str) -> Result<(), ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        let instance = host.instance_mut(id)?;
        let effects = instance.binding.teardown()?;
        instance.inbox.clear();
        apply_effects(&context, &effects);
        Ok(())
    }

    fn state(&self, id: &str) -> Result<ResolvedState, ConduitError> {
        let host = self.read()?;
        Ok(host.live(id)?.binding.state().clone())
    }

    fn lifecycle(&self, id: &str) -> Result<LifecycleState, ConduitError> {
        let host = self.read()?;
        Ok(host.instance(id)?.binding.lifecycle())
    }

    fn modes(&self) -> Result<Vec<InstanceSummary>, ConduitError> {
        let host = self.read()?;
        Ok(host
            .instances
            .iter()
            .map(|(id, instance)| {
                let binding = &instance.binding;
                InstanceSummary {
                    id: id.clone(),
                    widget_type: instance.widget_type.clone(),
                    kind: binding.spec().kind(),
                    mode: binding.mode(),
                    lifecycle: binding.lifecycle(),
                    error: binding.state().error.as_ref().map(|e| e.kind),
                    subscription_topic: binding.state().subscription_topic.clone(),
                    revision: binding.revision(),
                }
            })
            .collect())
    }

    fn set_connected(&self, connected: bool) -> Result<usize, ConduitError> {
        let mut host = self.write()?;
        let context = {
            let mut context = self
                .context
                .write()
                .map_err(|_| ConduitError::Internal("session context poisoned".to_string()))?;
            context.connected = connected;
            context.clone()
        };
        info!(connected, "session connectivity changed");
        Ok(host.invalidate(&context, |binding| {
            matches!(binding.spec(), ConnectionSpec::Subscription { .. })
                && binding.state().error.is_none()
                && binding.state().subscription_topic.is_some() != connected
        }))
    }

    fn begin(&self, id: &str, spec: ConnectionSpec) -> Result<Ticket, ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        let instance = host.live_mut(id)?;
        if spec.kind() != instance.binding.spec().kind() {
            let effects = instance.binding.renew(spec.clone());
            instance.inbox.clear();
            apply_effects(&context, &effects);
        }
        instance.binding.begin(spec)
    }

    fn commit(
        &self,
        ticket: Ticket,
        resolution: Resolution,
    ) -> Result<Commit, ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        let Some(instance) = host.instances.get_mut(&ticket.id) else {
            debug!(instance = %ticket.id, "discarding resolution for unknown instance");
            return Ok(Commit::Discarded);
        };
        let commit = instance.binding.commit(ticket, resolution);
        if let Commit::Applied(effects) = &commit {
            apply_effects(&context, effects);
        }
        Ok(commit)
    }

    fn deliver(&self, topic: &str, payload: Value) -> Result<usize, ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        let mut delivered = 0;
        for instance in host.instances.values_mut() {
            let subscribed = !instance.binding.is_torn_down()
                && instance.binding.state().subscription_topic.as_deref() == Some(topic);
            if subscribed {
                instance.inbox.push(payload.clone());
                delivered += 1;
            }
        }
        host.invalidate(&context, |binding| {
            binding.state().subscription_topic.as_deref() == Some(topic)
        });
        Ok(delivered)
    }

    fn inbox(&self, id: &str) -> Result<Vec<Value>, ConduitError> {
        let host = self.read()?;
        Ok(host.live(id)?.inbox.clone())
    }

    fn stream_insert(&self, stream: &str, item: Value) -> Result<(), ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        host.streams.insert(stream, item);
        host.invalidate(&context, |binding| bound_to_stream(binding, stream));
        Ok(())
    }

    fn stream_delete(&self, stream: &str, item_id: &Value) -> Result<bool, ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        let removed = host.streams.delete(stream, item_id);
        if removed {
            host.invalidate(&context, |binding| bound_to_stream(binding, stream));
        }
        Ok(removed)
    }

    fn stream_items(&self, id: &str) -> Result<Vec<Value>, ConduitError> {
        let host = self.read()?;
        let instance = host.live(id)?;
        let handle = instance.binding.state().stream_handle.as_ref().ok_or_else(|| {
            ConduitError::Validation(format!("instance {id} is not bound to a stream"))
        })?;
        Ok(host.streams.items(&handle.name).to_vec())
    }

    fn validate_form(
        &self,
        id: &str,
        partial: &Map<String, Value>,
    ) -> Result<ResolvedState, ConduitError> {
        let mut host = self.write()?;
        let instance = host.live_mut(id)?;
        let current = instance
            .binding
            .state()
            .form_handle
            .clone()
            .ok_or_else(|| ConduitError::Validation(format!("instance {id} has no form")))?;
        let form = shielded(id, || current.validate(partial))?;
        instance.binding.replace_form(form)?;
        Ok(instance.binding.state().clone())
    }

    fn submit_form(
        &self,
        id: &str,
        input: &Map<String, Value>,
    ) -> Result<FormOutcome, ConduitError> {
        let mut host = self.write()?;
        let context = self.context()?;
        let instance = host.live_mut(id)?;
        let form = instance
            .binding
            .state()
            .form_handle
            .clone()
            .ok_or_else(|| ConduitError::Validation(format!("instance {id} has no form")))?;

        match shielded(id, || form.submit(input))? {
            Ok(record) => {
                debug!(instance = %id, "form submitted, replacing form");
                let effects = instance.binding.refresh(&context)?;
                apply_effects(&context, &effects);
                Ok(FormOutcome::Submitted(record))
            }
            Err(rejected) => {
                let errors = rejected.errors().clone();
                instance.binding.replace_form(rejected)?;
                Ok(FormOutcome::Rejected(errors))
            }
        }
    }

    /// Execute the instance's pending action: the domain function named by
    /// the action, called with the record reference as its only argument.
    fn trigger_action(&self, id: &str) -> Result<Value, ConduitError> {
        let host = self.read()?;
        let context = self.context()?;
        let instance = host.live(id)?;
        let config = instance
            .binding
            .state()
            .action_config
            .as_ref()
            .ok_or_else(|| ConduitError::Validation(format!("instance {id} has no action")))?;
        let domain = context.domain.as_deref().ok_or_else(|| {
            ConduitError::Validation("session has no domain handle".to_string())
        })?;
        let args = std::slice::from_ref(&config.record_ref);
        Ok(shielded(id, || domain.invoke(&config.action, args))??)
    }
}

fn bound_to_stream(binding: &Binding, stream: &str) -> bool {
    matches!(binding.spec(), ConnectionSpec::Stream { stream_name } if stream_name == stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use conduit_api::{Effect, ErrorKind};
    use conduit_connectors::{FunctionRegistry, MemoryQueryExecutor, RecordingPubSub};
    use serde_json::json;

    fn runtime(pubsub: &Arc<RecordingPubSub>) -> ConduitRuntime {
        let mut registry = FunctionRegistry::new();
        registry.register("archive", 1, |args| Ok(json!({"archived": args[0]["id"]})));
        registry.register("purge", 1, |_| panic!("purge handler crashed"));
        registry.register_action("users", "register", vec!["email".to_string()], |input| {
            Ok(Value::Object(input.clone()))
        });
        let executor =
            MemoryQueryExecutor::new().with_resource("users", vec![json!({"id": 1})]);
        let context = SessionContext::detached(Arc::new(executor))
            .with_domain(Arc::new(registry))
            .with_pubsub(pubsub.clone())
            .connected(true);
        ConduitRuntime::new(context)
    }

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn mount_twice_conflicts() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        rt.mount("a".into(), "Banner".into(), ConnectionSpec::Static)
            .unwrap();
        let err = rt
            .mount("a".into(), "Banner".into(), ConnectionSpec::Static)
            .unwrap_err();
        assert!(matches!(err, ConduitError::Conflict(_)));
        assert!(matches!(rt.state("missing"), Err(ConduitError::NotFound(_))));
    }

    #[test]
    fn deliver_reaches_subscribers_only() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        rt.mount("t1".into(), "Ticker".into(), ConnectionSpec::subscription("orders"))
            .unwrap();
        rt.mount("t2".into(), "Ticker".into(), ConnectionSpec::subscription("invoices"))
            .unwrap();

        assert_eq!(rt.deliver("orders", json!({"id": 9})).unwrap(), 1);
        assert_eq!(rt.inbox("t1").unwrap(), vec![json!({"id": 9})]);
        assert!(rt.inbox("t2").unwrap().is_empty());
        assert_eq!(pubsub.subscriber_count("orders"), 1);
    }

    #[test]
    fn torn_down_instance_rejects_everything() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        rt.mount("t".into(), "Ticker".into(), ConnectionSpec::subscription("orders"))
            .unwrap();
        rt.teardown("t").unwrap();

        assert_eq!(rt.lifecycle("t").unwrap(), LifecycleState::TornDown);
        assert!(matches!(rt.teardown("t"), Err(ConduitError::TornDown(_))));
        assert!(matches!(rt.refresh("t"), Err(ConduitError::TornDown(_))));
        assert!(matches!(rt.state("t"), Err(ConduitError::TornDown(_))));
        assert!(matches!(
            rt.begin("t", ConnectionSpec::Static),
            Err(ConduitError::TornDown(_))
        ));
        assert_eq!(rt.deliver("orders", json!(1)).unwrap(), 0);
        assert!(pubsub.live_topics().is_empty());

        rt.mount("t".into(), "Ticker".into(), ConnectionSpec::subscription("orders"))
            .unwrap();
        assert_eq!(rt.lifecycle("t").unwrap(), LifecycleState::Resolved);
        assert_eq!(pubsub.live_topics(), vec!["orders"]);
    }

    #[test]
    fn stream_changes_refresh_bound_instances() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        rt.mount("feed".into(), "Feed".into(), ConnectionSpec::stream("activity"))
            .unwrap();
        let before = rt.modes().unwrap()[0].revision;

        rt.stream_insert("activity", json!({"id": 1, "text": "hello"}))
            .unwrap();
        rt.stream_insert("activity", json!({"id": 1, "text": "edited"}))
            .unwrap();
        assert_eq!(
            rt.stream_items("feed").unwrap(),
            vec![json!({"id": 1, "text": "edited"})]
        );
        assert!(rt.stream_delete("activity", &json!(1)).unwrap());
        assert!(!rt.stream_delete("activity", &json!(1)).unwrap());
        assert!(rt.stream_items("feed").unwrap().is_empty());

        let summary = &rt.modes().unwrap()[0];
        assert_eq!(summary.lifecycle, LifecycleState::Resolved);
        assert_eq!(summary.revision, before + 3);
    }

    #[test]
    fn rejected_submit_keeps_errors_then_accepts() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        let spec = ConnectionSpec::FormCreate {
            resource_id: "users".to_string(),
            action: "register".to_string(),
        };
        rt.mount("signup".into(), "SignupForm".into(), spec).unwrap();

        let outcome = rt.submit_form("signup", &input(json!({"name": "Ada"}))).unwrap();
        let FormOutcome::Rejected(errors) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert!(errors.contains_key("email"));
        let form = rt.state("signup").unwrap().form_handle.unwrap();
        assert_eq!(form.values().get("name"), Some(&json!("Ada")));

        let outcome = rt
            .submit_form("signup", &input(json!({"name": "Ada", "email": "ada@example.com"})))
            .unwrap();
        assert_eq!(
            outcome,
            FormOutcome::Submitted(json!({"name": "Ada", "email": "ada@example.com"}))
        );
        let fresh = rt.state("signup").unwrap().form_handle.unwrap();
        assert!(fresh.values().is_empty());
        assert!(fresh.errors().is_empty());
    }

    #[test]
    fn validate_form_requires_a_form() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        rt.mount("a".into(), "Banner".into(), ConnectionSpec::Static)
            .unwrap();
        let err = rt.validate_form("a", &Map::new()).unwrap_err();
        assert!(matches!(err, ConduitError::Validation(_)));
    }

    #[test]
    fn trigger_action_invokes_domain() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        let spec = ConnectionSpec::ActionInvocation {
            action: "archive".to_string(),
            record_ref: json!({"id": 4}),
        };
        rt.mount("btn".into(), "Button".into(), spec).unwrap();
        assert_eq!(rt.trigger_action("btn").unwrap(), json!({"archived": 4}));

        let spec = ConnectionSpec::ActionInvocation {
            action: "delete".to_string(),
            record_ref: json!({"id": 4}),
        };
        rt.mount("del".into(), "Button".into(), spec).unwrap();
        assert!(matches!(
            rt.trigger_action("del"),
            Err(ConduitError::Invocation(_))
        ));
    }

    #[test]
    fn async_commit_after_teardown_is_discarded() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        rt.mount("n".into(), "Counter".into(), ConnectionSpec::interface("archive", vec![]))
            .unwrap();
        assert_eq!(
            rt.state("n").unwrap().error.map(|e| e.kind),
            Some(ErrorKind::FunctionNotFound)
        );

        let ticket = rt
            .begin("n", ConnectionSpec::subscription("orders"))
            .unwrap();
        assert_eq!(rt.lifecycle("n").unwrap(), LifecycleState::Resolving);
        let resolution = ticket.resolve(&rt.context().unwrap());
        rt.teardown("n").unwrap();

        assert_eq!(rt.commit(ticket, resolution).unwrap(), Commit::Discarded);
        assert!(pubsub.events().is_empty());
    }

    #[test]
    fn ticket_from_before_remount_is_discarded() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        rt.mount("t".into(), "Ticker".into(), ConnectionSpec::subscription("orders"))
            .unwrap();
        let stale = rt
            .begin("t", ConnectionSpec::subscription("invoices"))
            .unwrap();
        let resolution = stale.resolve(&rt.context().unwrap());
        rt.teardown("t").unwrap();
        rt.mount("t".into(), "Ticker".into(), ConnectionSpec::subscription("orders"))
            .unwrap();

        assert_eq!(rt.commit(stale, resolution).unwrap(), Commit::Discarded);
        assert_eq!(
            rt.state("t").unwrap().subscription_topic.as_deref(),
            Some("orders")
        );
        assert_eq!(pubsub.live_topics(), vec!["orders"]);
    }

    #[test]
    fn connecting_registers_deferred_subscriptions_once() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        assert_eq!(rt.set_connected(false).unwrap(), 0);
        rt.mount("t".into(), "Ticker".into(), ConnectionSpec::subscription("orders"))
            .unwrap();
        rt.mount("a".into(), "Banner".into(), ConnectionSpec::Static)
            .unwrap();
        assert_eq!(rt.state("t").unwrap().subscription_topic, None);

        assert_eq!(rt.set_connected(true).unwrap(), 1);
        assert_eq!(rt.set_connected(true).unwrap(), 0);
        assert_eq!(
            rt.state("t").unwrap().subscription_topic.as_deref(),
            Some("orders")
        );
        assert_eq!(pubsub.events(), vec![Effect::Subscribe("orders".to_string())]);

        rt.update("t", ConnectionSpec::subscription("orders")).unwrap();
        assert_eq!(pubsub.events().len(), 1);

        assert_eq!(rt.set_connected(false).unwrap(), 1);
        assert!(pubsub.live_topics().is_empty());
    }

    #[test]
    fn panicking_action_leaves_runtime_usable() {
        let pubsub = Arc::new(RecordingPubSub::new());
        let rt = runtime(&pubsub);
        let spec = ConnectionSpec::ActionInvocation {
            action: "purge".to_string(),
            record_ref: json!({"id": 4}),
        };
        rt.mount("purge".into(), "Button".into(), spec).unwrap();
        rt.mount("a".into(), "Banner".into(), ConnectionSpec::Static)
            .unwrap();

        assert!(matches!(
            rt.trigger_action("purge"),
            Err(ConduitError::Invocation(_))
        ));
        assert!(rt.state("a").is_ok());
        rt.refresh("a").unwrap();
    }
}
