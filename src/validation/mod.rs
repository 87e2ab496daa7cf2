// Declarative field validation: single-field transform/predicate chains,
// list and dict composites, and the coercion step library. Validator sets
// are assembled once at startup and shared read-only across requests.

pub mod dict;
pub mod list;
pub mod process;
pub mod validator;

pub use dict::DictValidator;
pub use list::ListValidator;
pub use validator::{Step, Validator};

use serde_json::Value;

use crate::api::error::{ApiError, ErrorTemplate};
use crate::api::Code;

pub mod errors {
    use super::*;

    pub const MISSING_FIELD: ErrorTemplate =
        ErrorTemplate::new("Field {field} is required", Code::BadRequest);
    pub const NOT_A_LIST: ErrorTemplate =
        ErrorTemplate::new("Field {field} should be a list", Code::BadRequest);
    pub const NOT_AN_INT: ErrorTemplate =
        ErrorTemplate::new("Invalid integer: {value}", Code::BadRequest);
    pub const NOT_A_STRING: ErrorTemplate =
        ErrorTemplate::new("Invalid string: {value}", Code::BadRequest);
    pub const INVALID_BODY: ErrorTemplate =
        ErrorTemplate::new("Request body should be a JSON object", Code::BadRequest);
}

/// A named validation rule the extraction stages can run: reads one raw
/// field from a source namespace and yields the validated value under the
/// rule's target name. Implemented by Validator and ListValidator.
pub trait Validate: Send + Sync {
    /// Raw field name read from the source namespace.
    fn source(&self) -> &str;

    /// Name the validated value is stored under.
    fn target(&self) -> &str;

    fn apply(&self, raw: Option<Value>) -> Result<Value, ApiError>;
}
