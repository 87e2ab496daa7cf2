use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api::error::ApiError;
use crate::api::Code;
use crate::models::user::User;

/// Which raw source an extraction stage reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Query,
    Body,
}

/// Per-request namespaces. Built fresh for every request and dropped with
/// the response; nothing here outlives one pipeline run.
#[derive(Debug, Default)]
pub struct RequestContext {
    query: Map<String, Value>,
    body: Map<String, Value>,
    /// Merged view over both extraction namespaces, written as stages run;
    /// later writes win on (unusual) name collisions.
    data: Map<String, Value>,
    principal: Option<User>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: Source, name: &str, value: Value) {
        let namespace = match source {
            Source::Query => &mut self.query,
            Source::Body => &mut self.body,
        };
        namespace.insert(name.to_string(), value.clone());
        self.data.insert(name.to_string(), value);
    }

    pub fn set_principal(&mut self, user: User) {
        self.principal = Some(user);
    }

    /// The authenticated user, present once the auth stage has run.
    pub fn principal(&self) -> Option<&User> {
        self.principal.as_ref()
    }

    /// Principal accessor for handlers behind an auth stage.
    pub fn require_principal(&self) -> Result<&User, ApiError> {
        self.principal()
            .ok_or_else(|| ApiError::new(Code::Unauthorized, "Authentication required"))
    }

    pub fn query(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    pub fn body(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    pub fn data(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Typed read from the merged namespace. Entity-resolving validators
    /// store serialized entities; handlers pull them back out as structs.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        let value = self
            .data(name)
            .cloned()
            .ok_or_else(|| ApiError::bad_request(format!("Field {name} is required")))?;
        serde_json::from_value(value)
            .map_err(|_| ApiError::bad_request(format!("Field {name} is malformed")))
    }
}
