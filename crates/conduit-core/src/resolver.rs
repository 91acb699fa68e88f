//! Turns a [`ConnectionSpec`] plus session capabilities into render state.
//!
//! Resolution is synchronous and never fails: every failure is reported in
//! [`ResolvedState::error`]. Subscription registration is not performed
//! here; it is returned as [`Effect`]s for the host to apply.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use conduit_api::{
    ActionConfig, ConnectionSpec, DomainHandle, Effect, ErrorInfo, FormHandle, FormTarget,
    InvocationError, Mode, QueryBuilder, Resolution, ResolvedState, SessionContext, Snapshot,
    SortField, StreamRef,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::mode::detect_mode;

/// Resolve `spec`, reusing `previous` verbatim when it was resolved from a
/// structurally equal spec.
///
/// Reuse touches no capability and emits no effect, so incidental
/// re-renders never re-run domain functions or queries. A subscription
/// whose registration no longer matches `context.connected` is resolved
/// again, so a deferred topic is registered once the session connects.
pub fn resolve(
    spec: &ConnectionSpec,
    context: &SessionContext,
    previous: Option<&Snapshot>,
) -> Resolution {
    if let Some(previous) = previous.filter(|p| reusable(p, spec, context)) {
        debug!(kind = %spec.kind(), "connection unchanged, reusing resolved state");
        return Resolution::new(previous.state.clone());
    }
    refresh(spec, context, previous)
}

/// Resolve `spec` unconditionally.
///
/// `previous` is only consulted to diff subscriptions: an unchanged topic is
/// not subscribed twice, and a topic that is no longer wanted is released.
pub fn refresh(
    spec: &ConnectionSpec,
    context: &SessionContext,
    previous: Option<&Snapshot>,
) -> Resolution {
    let mode = detect_mode(spec);
    debug!(kind = %spec.kind(), %mode, "resolving connection");

    let state = match spec.validate() {
        Ok(()) if mode == Mode::Static => ResolvedState::ready(),
        Ok(()) => dispatch(spec, context),
        Err(reason) => invalid(spec, reason),
    };

    let previous_topic = previous.and_then(|p| p.state.subscription_topic.as_deref());
    let effects = subscription_effects(previous_topic, state.subscription_topic.as_deref());
    Resolution { state, effects }
}

fn reusable(previous: &Snapshot, spec: &ConnectionSpec, context: &SessionContext) -> bool {
    if previous.spec != *spec {
        return false;
    }
    match spec {
        ConnectionSpec::Subscription { .. } if previous.state.error.is_none() => {
            previous.state.subscription_topic.is_some() == context.connected
        }
        _ => true,
    }
}

/// Effects to apply when the instance holding `previous` goes away.
pub fn release(previous: &Snapshot) -> Vec<Effect> {
    previous
        .state
        .subscription_topic
        .iter()
        .map(|topic| Effect::Unsubscribe(topic.clone()))
        .collect()
}

fn dispatch(spec: &ConnectionSpec, context: &SessionContext) -> ResolvedState {
    match spec {
        ConnectionSpec::Static => ResolvedState::ready(),
        ConnectionSpec::Interface {
            function_name,
            args,
        } => match require_domain(spec, context) {
            Ok(domain) => resolve_interface(domain.as_ref(), function_name, args),
            Err(state) => state,
        },
        ConnectionSpec::ResourceQuery {
            resource_id,
            filter,
            sort,
            load,
            limit,
        } => match require_domain(spec, context) {
            Ok(_) => resolve_query(
                context,
                resource_id,
                filter.as_ref(),
                sort.as_deref(),
                load.as_deref(),
                *limit,
            ),
            Err(state) => state,
        },
        ConnectionSpec::Stream { stream_name } => ResolvedState {
            stream_handle: Some(StreamRef {
                name: stream_name.clone(),
            }),
            ..ResolvedState::ready()
        },
        ConnectionSpec::FormCreate {
            resource_id,
            action,
        } => resolve_form(
            spec,
            context,
            FormTarget::Create {
                resource_id: resource_id.clone(),
                action: action.clone(),
            },
        ),
        ConnectionSpec::FormUpdate { record_ref, action } => resolve_form(
            spec,
            context,
            FormTarget::Update {
                record_ref: record_ref.clone(),
                action: action.clone(),
            },
        ),
        ConnectionSpec::ActionInvocation { action, record_ref } => ResolvedState {
            action_config: Some(ActionConfig {
                action: action.clone(),
                record_ref: record_ref.clone(),
            }),
            ..ResolvedState::ready()
        },
        ConnectionSpec::Subscription { topic } => {
            if context.connected {
                ResolvedState {
                    subscription_topic: Some(topic.clone()),
                    ..ResolvedState::ready()
                }
            } else {
                debug!(%topic, "session not connected, deferring subscription");
                ResolvedState::ready()
            }
        }
    }
}

fn resolve_interface(domain: &dyn DomainHandle, name: &str, args: &[Value]) -> ResolvedState {
    if !domain.has_function(name, args.len()) {
        return ResolvedState::failed(ErrorInfo::function_not_found(name, args.len()));
    }
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| domain.invoke(name, args)))
        .unwrap_or_else(|payload| Err(InvocationError::Failed(panic_message(&*payload))));
    match outcome {
        Ok(result) => ResolvedState::with_data(result),
        Err(InvocationError::NotFound { name, arity }) => {
            ResolvedState::failed(ErrorInfo::function_not_found(&name, arity))
        }
        Err(InvocationError::Failed(message)) => {
            debug!(function = name, %message, "domain function failed");
            ResolvedState::failed(ErrorInfo::invocation_failed(message))
        }
    }
}

fn resolve_query(
    context: &SessionContext,
    resource_id: &str,
    filter: Option<&Map<String, Value>>,
    sort: Option<&[SortField]>,
    load: Option<&[String]>,
    limit: Option<usize>,
) -> ResolvedState {
    let query = QueryBuilder::new()
        .filter(filter.cloned())
        .sort(sort.map(<[SortField]>::to_vec))
        .load(load.map(<[String]>::to_vec))
        .limit(limit)
        .build();

    let executor = context.query_executor.as_ref();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(resource_id, &query)));
    match outcome {
        Ok(Ok(rows)) => ResolvedState::with_data(Value::Array(rows)),
        Ok(Err(err)) => {
            debug!(resource = resource_id, error = %err, "query failed");
            ResolvedState::failed(ErrorInfo::query_failed(err.to_string()))
        }
        Err(payload) => {
            let message = panic_message(&*payload);
            warn!(resource = resource_id, %message, "query executor panicked");
            ResolvedState::failed(ErrorInfo::query_failed(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panicked: {detail}")
}

fn resolve_form(
    spec: &ConnectionSpec,
    context: &SessionContext,
    target: FormTarget,
) -> ResolvedState {
    match require_domain(spec, context) {
        Ok(domain) => ResolvedState {
            form_handle: Some(FormHandle::new(target, domain)),
            ..ResolvedState::ready()
        },
        Err(state) => state,
    }
}

fn require_domain(
    spec: &ConnectionSpec,
    context: &SessionContext,
) -> Result<Arc<dyn DomainHandle>, ResolvedState> {
    context
        .domain
        .clone()
        .ok_or_else(|| invalid(spec, format!("{} requires a domain handle", spec.kind())))
}

fn invalid(spec: &ConnectionSpec, reason: String) -> ResolvedState {
    warn!(kind = %spec.kind(), %reason, "invalid connection spec");
    ResolvedState::failed(ErrorInfo::invalid_spec(reason))
}

fn subscription_effects(previous: Option<&str>, next: Option<&str>) -> Vec<Effect> {
    if previous == next {
        return Vec::new();
    }
    let mut effects = Vec::with_capacity(2);
    if let Some(topic) = previous {
        effects.push(Effect::Unsubscribe(topic.to_string()));
    }
    if let Some(topic) = next {
        effects.push(Effect::Subscribe(topic.to_string()));
    }
    effects
}
