use std::sync::Arc;

use serde_json::Value;

use crate::api::error::{ApiError, ErrorTemplate};
use crate::validation::{errors, Validate};

/// A transform step: coercion (string to int) or entity resolution (id to
/// entity). Steps fail with their own typed error and short-circuit the
/// chain.
pub type Step = Arc<dyn Fn(Value) -> Result<Value, ApiError> + Send + Sync>;

type Check = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Single-field validation chain: ordered transform steps, then ordered
/// predicates, each predicate paired with the error it raises on failure.
///
/// Construction is append-only; `copy()` yields an independent clone whose
/// step/predicate lists can be extended without touching the original, which
/// is how variant registries override inherited rules.
#[derive(Clone)]
pub struct Validator {
    name: String,
    final_name: String,
    steps: Vec<Step>,
    predicates: Vec<(Check, ErrorTemplate)>,
    nullable: bool,
    default: Option<Value>,
}

impl Validator {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            final_name: name.clone(),
            name,
            steps: Vec::new(),
            predicates: Vec::new(),
            nullable: false,
            default: None,
        }
    }

    /// Store the validated value under a different name than the raw field,
    /// e.g. `chat_id` resolves into `chat`.
    pub fn rename(mut self, final_name: impl Into<String>) -> Self {
        self.final_name = final_name.into();
        self
    }

    /// Append a transform step.
    pub fn to(mut self, step: impl Fn(Value) -> Result<Value, ApiError> + Send + Sync + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append a predicate that rejects with a fixed BadRequest message.
    pub fn bool(
        self,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
        message: &'static str,
    ) -> Self {
        self.check(check, ErrorTemplate::bad_request(message))
    }

    /// Append a predicate paired with an explicit error.
    pub fn check(
        mut self,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
        error: ErrorTemplate,
    ) -> Self {
        self.predicates.push((Arc::new(check), error));
        self
    }

    /// Accept an absent field, yielding null.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Value substituted when the field is absent. Defaults bypass the
    /// step and predicate chain entirely.
    pub fn default_to(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Independent clone for override: extending the copy never mutates the
    /// original. Step and predicate closures are shared immutably.
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

impl Validate for Validator {
    fn source(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &str {
        &self.final_name
    }

    fn apply(&self, raw: Option<Value>) -> Result<Value, ApiError> {
        // Explicit JSON null counts as absent: a nullable field sent as
        // null behaves like an omitted one.
        let mut value = match raw {
            Some(value) if !value.is_null() => value,
            _ => {
                if let Some(default) = &self.default {
                    return Ok(default.clone());
                }
                if self.nullable {
                    return Ok(Value::Null);
                }
                return Err(errors::MISSING_FIELD.with(&[("field", &self.name)]));
            }
        };

        for step in &self.steps {
            value = step(value)?;
        }
        for (check, error) in &self.predicates {
            if !check(&value) {
                return Err(error.raise());
            }
        }
        Ok(value)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("final_name", &self.final_name)
            .field("steps", &self.steps.len())
            .field("predicates", &self.predicates.len())
            .field("nullable", &self.nullable)
            .field("default", &self.default)
            .finish()
    }
}
