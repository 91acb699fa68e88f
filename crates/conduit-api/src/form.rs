//! Form handles.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::DomainHandle;

/// Field name to validation messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// The action a form submits to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FormTarget {
    Create { resource_id: String, action: String },
    Update { record_ref: Value, action: String },
}

impl FormTarget {
    pub fn action(&self) -> &str {
        match self {
            FormTarget::Create { action, .. } | FormTarget::Update { action, .. } => action,
        }
    }
}

/// An editable record bound to a create or update action.
///
/// Handles are values: [`FormHandle::validate`] and a failed
/// [`FormHandle::submit`] return a new handle carrying the merged input and
/// the errors, leaving the original untouched.
#[derive(Clone, Serialize)]
pub struct FormHandle {
    target: FormTarget,
    values: Map<String, Value>,
    errors: FieldErrors,
    #[serde(skip)]
    domain: Arc<dyn DomainHandle>,
}

impl FormHandle {
    /// Fresh form with no errors. Update forms start from the record's fields.
    pub fn new(target: FormTarget, domain: Arc<dyn DomainHandle>) -> Self {
        let values = match &target {
            FormTarget::Update {
                record_ref: Value::Object(fields),
                ..
            } => fields.clone(),
            _ => Map::new(),
        };
        Self {
            target,
            values,
            errors: FieldErrors::new(),
            domain,
        }
    }

    pub fn target(&self) -> &FormTarget {
        &self.target
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Merge `partial` into the current values and run the action's validation.
    #[must_use]
    pub fn validate(&self, partial: &Map<String, Value>) -> FormHandle {
        let values = self.merged(partial);
        let errors = self.domain.validate_form(&self.target, &values);
        self.with(values, errors)
    }

    /// Submit `input` merged over the current values.
    ///
    /// On rejection the returned handle holds the merged values and the
    /// errors reported by the domain.
    pub fn submit(&self, input: &Map<String, Value>) -> Result<Value, FormHandle> {
        let values = self.merged(input);
        match self.domain.submit_form(&self.target, &values) {
            Ok(record) => Ok(record),
            Err(errors) => Err(self.with(values, errors)),
        }
    }

    fn merged(&self, input: &Map<String, Value>) -> Map<String, Value> {
        let mut values = self.values.clone();
        for (field, value) in input {
            values.insert(field.clone(), value.clone());
        }
        values
    }

    fn with(&self, values: Map<String, Value>, errors: FieldErrors) -> FormHandle {
        FormHandle {
            target: self.target.clone(),
            values,
            errors,
            domain: Arc::clone(&self.domain),
        }
    }
}

impl PartialEq for FormHandle {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
            && self.values == other.values
            && self.errors == other.errors
            && Arc::ptr_eq(&self.domain, &other.domain)
    }
}

impl fmt::Debug for FormHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormHandle")
            .field("target", &self.target)
            .field("values", &self.values)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InvocationError;
    use serde_json::json;

    struct RequiresName;

    impl DomainHandle for RequiresName {
        fn has_function(&self, _name: &str, _arity: usize) -> bool {
            false
        }

        fn invoke(&self, name: &str, args: &[Value]) -> Result<Value, InvocationError> {
            Err(InvocationError::NotFound {
                name: name.to_string(),
                arity: args.len(),
            })
        }

        fn validate_form(&self, _target: &FormTarget, input: &Map<String, Value>) -> FieldErrors {
            let mut errors = FieldErrors::new();
            if !input.contains_key("name") {
                errors.insert("name".to_string(), vec!["is required".to_string()]);
            }
            errors
        }

        fn submit_form(
            &self,
            target: &FormTarget,
            input: &Map<String, Value>,
        ) -> Result<Value, FieldErrors> {
            let errors = self.validate_form(target, input);
            if errors.is_empty() {
                Ok(Value::Object(input.clone()))
            } else {
                Err(errors)
            }
        }
    }

    fn create_form() -> FormHandle {
        FormHandle::new(
            FormTarget::Create {
                resource_id: "users".to_string(),
                action: "register".to_string(),
            },
            Arc::new(RequiresName),
        )
    }

    #[test]
    fn update_form_starts_from_record() {
        let form = FormHandle::new(
            FormTarget::Update {
                record_ref: json!({"id": 3, "name": "Ada"}),
                action: "rename".to_string(),
            },
            Arc::new(RequiresName),
        );
        assert_eq!(form.values().get("name"), Some(&json!("Ada")));
        assert!(form.is_valid());
        assert_eq!(form.target().action(), "rename");
    }

    #[test]
    fn validate_returns_new_handle() {
        let form = create_form();
        let checked = form.validate(&Map::new());
        assert!(form.is_valid());
        assert_eq!(checked.errors()["name"], vec!["is required".to_string()]);

        let mut partial = Map::new();
        partial.insert("name".to_string(), json!("Grace"));
        assert!(checked.validate(&partial).is_valid());
    }

    #[test]
    fn rejected_submit_keeps_input() {
        let form = create_form();
        let mut input = Map::new();
        input.insert("email".to_string(), json!("g@example.com"));

        let rejected = form.submit(&input).unwrap_err();
        assert_eq!(rejected.values().get("email"), Some(&json!("g@example.com")));
        assert!(!rejected.is_valid());

        input.insert("name".to_string(), json!("Grace"));
        let record = form.submit(&input).unwrap();
        assert_eq!(record["name"], json!("Grace"));
    }
}
