use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::validation::validator::Validator;
use crate::validation::Validate;

/// A set of named field validators applied to a keyed structure. Used to
/// type-check decoded token payloads before trusting their contents: a
/// credential that decodes structurally can still carry wrong field types.
#[derive(Clone, Default)]
pub struct DictValidator {
    fields: Vec<Validator>,
}

impl DictValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Validator>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Validate every declared field and return the cleaned mapping keyed
    /// by final names. Missing fields fail unless their validator accepts
    /// null or carries a default.
    pub fn clean(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, ApiError> {
        let mut cleaned = Map::new();
        for field in &self.fields {
            let raw = input.get(field.source()).cloned();
            let value = field.apply(raw)?;
            cleaned.insert(field.target().to_string(), value);
        }
        Ok(cleaned)
    }
}
