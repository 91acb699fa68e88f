use conduit_api::ResolvedState;
use conduit_core::{DeclarationCatalog, detect_mode};
use conduit_runtime::WidgetRuntime;
use serde_json::{Value, json};

use crate::{Session, pout};

pub fn cmd_modes(catalog: &DeclarationCatalog, json: bool) -> anyhow::Result<()> {
    let rows: Vec<Value> = catalog
        .widgets
        .values()
        .map(|w| {
            json!({
                "id": w.id,
                "widget": w.widget,
                "kind": w.connection.kind(),
                "mode": detect_mode(&w.connection),
            })
        })
        .collect();
    let text = catalog
        .widgets
        .values()
        .map(|w| {
            format!(
                "{:<20} {:<16} {:<18} {}",
                w.id,
                w.widget,
                w.connection.kind(),
                detect_mode(&w.connection)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    pout(json, Value::Array(rows), &text)
}

pub fn cmd_resolve(
    catalog: &DeclarationCatalog,
    session: &Session,
    only: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(id) = only {
        if !catalog.widgets.contains_key(id) {
            anyhow::bail!("widget '{id}' is not declared");
        }
    }

    let mut states = serde_json::Map::new();
    let mut lines = Vec::new();
    for declaration in catalog.widgets.values() {
        if only.is_some_and(|id| id != declaration.id) {
            continue;
        }
        let state = session.runtime.mount(
            declaration.id.clone(),
            declaration.widget.clone(),
            declaration.connection.clone(),
        )?;
        lines.push(format!("{:<20} {}", declaration.id, describe(&state)));
        states.insert(declaration.id.clone(), serde_json::to_value(&state)?);
    }

    let effects = session.pubsub.events();
    if !effects.is_empty() {
        lines.push(format!("effects: {}", serde_json::to_string(&effects)?));
    }
    pout(
        json,
        json!({"widgets": states, "effects": effects}),
        &lines.join("\n"),
    )
}

pub fn cmd_deliver(
    catalog: &DeclarationCatalog,
    session: &Session,
    topic: &str,
    payload: Value,
    json: bool,
) -> anyhow::Result<()> {
    mount_all(catalog, session)?;
    let delivered = session.runtime.deliver(topic, payload)?;
    pout(
        json,
        json!({"topic": topic, "delivered": delivered}),
        &format!("Delivered to {delivered} widget(s) on {topic}"),
    )
}

pub fn cmd_teardown_check(
    catalog: &DeclarationCatalog,
    session: &Session,
    json: bool,
) -> anyhow::Result<()> {
    mount_all(catalog, session)?;
    let subscribed = session.pubsub.live_topics();
    for id in catalog.widgets.keys() {
        session.runtime.teardown(id)?;
    }

    let leaked = session.pubsub.live_topics();
    let effects = session.pubsub.events();
    pout(
        json,
        json!({
            "widgets": catalog.widgets.len(),
            "subscribed": subscribed,
            "effects": effects,
            "leaked": leaked,
        }),
        &format!(
            "Tore down {} widgets, {} effect(s), {} topic(s) still live",
            catalog.widgets.len(),
            effects.len(),
            leaked.len()
        ),
    )?;
    if !leaked.is_empty() {
        anyhow::bail!("topics still subscribed after teardown: {}", leaked.join(", "));
    }
    Ok(())
}

fn mount_all(catalog: &DeclarationCatalog, session: &Session) -> anyhow::Result<()> {
    for declaration in catalog.widgets.values() {
        session.runtime.mount(
            declaration.id.clone(),
            declaration.widget.clone(),
            declaration.connection.clone(),
        )?;
    }
    Ok(())
}

/// One-line summary of a resolved state for text output.
fn describe(state: &ResolvedState) -> String {
    if let Some(error) = &state.error {
        return format!("error {:?}: {}", error.kind, error.message);
    }
    if state.loading {
        return "loading".to_string();
    }
    if let Some(topic) = &state.subscription_topic {
        return format!("subscribed to {topic}");
    }
    if let Some(stream) = &state.stream_handle {
        return format!("stream {}", stream.name);
    }
    if let Some(form) = &state.form_handle {
        return format!("form {}", form.target().action());
    }
    if let Some(action) = &state.action_config {
        return format!("action {}", action.action);
    }
    match &state.data {
        Some(Value::Array(rows)) => format!("{} row(s)", rows.len()),
        Some(data) => format!("data {data}"),
        None => "ok".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_api::{ErrorInfo, StreamRef};

    #[test]
    fn describe_prefers_error() {
        let mut state = ResolvedState::failed(ErrorInfo::function_not_found("count", 0));
        state.data = Some(json!([1]));
        assert!(describe(&state).starts_with("error FunctionNotFound"));
    }

    #[test]
    fn describe_rows_and_handles() {
        assert_eq!(describe(&ResolvedState::with_data(json!([1, 2]))), "2 row(s)");
        assert_eq!(describe(&ResolvedState::ready()), "ok");
        assert_eq!(describe(&ResolvedState::pending()), "loading");

        let state = ResolvedState {
            stream_handle: Some(StreamRef {
                name: "activity".to_string(),
            }),
            ..ResolvedState::ready()
        };
        assert_eq!(describe(&state), "stream activity");
    }
}
