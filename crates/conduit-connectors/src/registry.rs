//! Explicit function and action registry backing [`DomainHandle`].

use std::collections::BTreeMap;
use std::sync::Arc;

use conduit_api::{DomainHandle, FieldErrors, FormTarget, InvocationError};
use serde_json::{Map, Value};

type Callable = Arc<dyn Fn(&[Value]) -> Result<Value, InvocationError> + Send + Sync>;
type Handler = Arc<dyn Fn(&Map<String, Value>) -> Result<Value, FieldErrors> + Send + Sync>;

/// A named function with a fixed parameter count.
#[derive(Clone)]
pub struct FunctionDef {
    pub name: String,
    pub arity: usize,
    callable: Callable,
}

/// A create or update action that forms submit to.
#[derive(Clone)]
pub struct ActionDef {
    pub resource_id: String,
    pub action: String,
    pub required: Vec<String>,
    handler: Handler,
}

/// Domain handle built from explicitly registered callables.
///
/// Functions are keyed by `(name, arity)`, actions by `(resource_id, action)`.
/// Update forms find their action through the record's `resource` field,
/// falling back to the first action with a matching name.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<(String, usize), FunctionDef>,
    actions: BTreeMap<(String, String), ActionDef>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callable` under `name` with the given arity, replacing any
    /// previous definition with the same signature.
    pub fn register<F>(&mut self, name: impl Into<String>, arity: usize, callable: F)
    where
        F: Fn(&[Value]) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.functions.insert(
            (name.clone(), arity),
            FunctionDef {
                name,
                arity,
                callable: Arc::new(callable),
            },
        );
    }

    pub fn register_action<F>(
        &mut self,
        resource_id: impl Into<String>,
        action: impl Into<String>,
        required: Vec<String>,
        handler: F,
    ) where
        F: Fn(&Map<String, Value>) -> Result<Value, FieldErrors> + Send + Sync + 'static,
    {
        let resource_id = resource_id.into();
        let action = action.into();
        self.actions.insert(
            (resource_id.clone(), action.clone()),
            ActionDef {
                resource_id,
                action,
                required,
                handler: Arc::new(handler),
            },
        );
    }

    pub fn contains(&self, name: &str, arity: usize) -> bool {
        self.functions.contains_key(&(name.to_string(), arity))
    }

    fn action_for(&self, target: &FormTarget) -> Option<&ActionDef> {
        match target {
            FormTarget::Create {
                resource_id,
                action,
            } => self.actions.get(&(resource_id.clone(), action.clone())),
            FormTarget::Update { record_ref, action } => {
                match record_ref.get("resource").and_then(Value::as_str) {
                    Some(resource_id) => self
                        .actions
                        .get(&(resource_id.to_string(), action.clone())),
                    None => self.actions.values().find(|def| &def.action == action),
                }
            }
        }
    }
}

impl DomainHandle for FunctionRegistry {
    fn has_function(&self, name: &str, arity: usize) -> bool {
        self.contains(name, arity)
    }

    fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, InvocationError> {
        let def = self
            .functions
            .get(&(name.to_string(), args.len()))
            .ok_or_else(|| InvocationError::NotFound {
                name: name.to_string(),
                arity: args.len(),
            })?;
        (def.callable)(args)
    }

    fn validate_form(&self, target: &FormTarget, input: &Map<String, Value>) -> FieldErrors {
        let Some(def) = self.action_for(target) else {
            return base_error(format!("unknown action {}", target.action()));
        };

        let mut errors = FieldErrors::new();
        for field in &def.required {
            let missing = match input.get(field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                errors
                    .entry(field.clone())
                    .or_default()
                    .push("is required".to_string());
            }
        }
        errors
    }

    fn submit_form(
        &self,
        target: &FormTarget,
        input: &Map<String, Value>,
    ) -> Result<Value, FieldErrors> {
        let errors = self.validate_form(target, input);
        if !errors.is_empty() {
            return Err(errors);
        }
        match self.action_for(target) {
            Some(def) => (def.handler)(input),
            None => Err(base_error(format!("unknown action {}", target.action()))),
        }
    }
}

fn base_error(message: String) -> FieldErrors {
    FieldErrors::from([("base".to_string(), vec![message])])
}
