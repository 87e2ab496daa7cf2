use std::sync::Arc;

use serde_json::Value;

use crate::api::error::{ApiError, ErrorTemplate};
use crate::validation::validator::Validator;
use crate::validation::{errors, Validate};

type ListCheck = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Composite validator over a JSON array: every element runs through the
/// element validator, then whole-list predicates run over the validated
/// list. Element failures name the offending index; list-level failures
/// carry their own message.
#[derive(Clone)]
pub struct ListValidator {
    name: String,
    final_name: String,
    element: Option<Validator>,
    predicates: Vec<(ListCheck, ErrorTemplate)>,
}

impl ListValidator {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            final_name: name.clone(),
            name,
            element: None,
            predicates: Vec::new(),
        }
    }

    pub fn rename(mut self, final_name: impl Into<String>) -> Self {
        self.final_name = final_name.into();
        self
    }

    /// Per-item validator. Without one, elements pass through unchanged.
    pub fn element(mut self, validator: Validator) -> Self {
        self.element = Some(validator);
        self
    }

    /// Whole-list predicate, evaluated only after every element validates.
    pub fn bool(
        mut self,
        check: impl Fn(&[Value]) -> bool + Send + Sync + 'static,
        message: &'static str,
    ) -> Self {
        self.predicates
            .push((Arc::new(check), ErrorTemplate::bad_request(message)));
        self
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }
}

impl Validate for ListValidator {
    fn source(&self) -> &str {
        &self.name
    }

    fn target(&self) -> &str {
        &self.final_name
    }

    fn apply(&self, raw: Option<Value>) -> Result<Value, ApiError> {
        let items = match raw {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(errors::NOT_A_LIST.with(&[("field", &self.name)])),
            None => return Err(errors::MISSING_FIELD.with(&[("field", &self.name)])),
        };

        let mut validated = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let value = match &self.element {
                Some(element) => element.apply(Some(item)).map_err(|err| ApiError {
                    code: err.code,
                    message: format!("{} ({}[{}])", err.message, self.name, index),
                })?,
                None => item,
            };
            validated.push(value);
        }

        for (check, error) in &self.predicates {
            if !check(&validated) {
                return Err(error.raise());
            }
        }
        Ok(Value::Array(validated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Code;
    use crate::validation::process;
    use serde_json::json;

    fn unique_ints(items: &[Value]) -> bool {
        let mut seen = std::collections::HashSet::new();
        items.iter().all(|item| seen.insert(item.as_i64()))
    }

    fn guests() -> ListValidator {
        ListValidator::new("guests")
            .element(Validator::new("guest").to(process::int))
            .bool(unique_ints, "duplicated guests")
    }

    #[test]
    fn test_duplicates_fail_with_list_error_not_element_error() {
        let err = guests().apply(Some(json!([1, 1]))).unwrap_err();
        assert_eq!(err.code, Code::BadRequest);
        assert_eq!(err.message, "duplicated guests");
    }

    #[test]
    fn test_distinct_elements_pass() {
        assert_eq!(guests().apply(Some(json!([1, 2]))).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_element_failure_names_the_offending_index() {
        let err = guests().apply(Some(json!([1, "x", 3]))).unwrap_err();
        assert_eq!(err.message, "Invalid integer: x (guests[1])");
    }

    #[test]
    fn test_list_predicates_run_only_after_elements_validate() {
        // The duplicate check would also match [1, "1", 1] after coercion,
        // but the element failure at index 1 must win.
        let validator = ListValidator::new("guests")
            .element(Validator::new("guest").bool(|v| v.is_i64(), "not a number"))
            .bool(|_| false, "list level");
        let err = validator.apply(Some(json!([1, "1"]))).unwrap_err();
        assert_eq!(err.message, "not a number (guests[1])");
    }

    #[test]
    fn test_non_array_input_rejected() {
        let err = guests().apply(Some(json!("nope"))).unwrap_err();
        assert_eq!(err.message, "Field guests should be a list");
    }

    #[test]
    fn test_absent_list_is_required() {
        let err = guests().apply(None).unwrap_err();
        assert_eq!(err.message, "Field guests is required");
    }

    #[test]
    fn test_empty_list_passes_validation() {
        // Emptiness is a business rule, not a shape rule
        assert_eq!(guests().apply(Some(json!([]))).unwrap(), json!([]));
    }
}
