// Uniform response envelope: {"code": int, "message": string|null, "body": any|null}.
// Success carries the handler's body and a null message; failure carries the
// error's resolved message and a null body. The HTTP status mirrors the code.

use axum::{
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::api::code::Code;
use crate::api::error::ApiError;

/// Handler output: an optional JSON body on success, an ApiError otherwise.
/// `Ok(None)` renders as a null body.
pub type HandlerResult = Result<Option<Value>, ApiError>;

#[derive(Debug)]
pub struct Envelope {
    code: Code,
    message: Option<String>,
    body: Option<Value>,
}

impl Envelope {
    pub fn ok(body: Option<Value>) -> Self {
        Self {
            code: Code::Ok,
            message: None,
            body,
        }
    }

    pub fn failure(error: &ApiError) -> Self {
        Self {
            code: error.code,
            message: Some(error.message.clone()),
            body: None,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code.as_u16(),
            "message": self.message,
            "body": self.body,
        })
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self.to_json())).into_response()
    }
}

/// Convert a pipeline result into the wire response.
pub fn respond(result: HandlerResult) -> Response {
    match result {
        Ok(body) => Envelope::ok(body).into_response(),
        Err(error) => {
            tracing::debug!("request rejected: {} ({:?})", error.message, error.code);
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let envelope = Envelope::ok(Some(json!({"chat_id": 7})));
        assert_eq!(
            envelope.to_json(),
            json!({"code": 200, "message": null, "body": {"chat_id": 7}})
        );
    }

    #[test]
    fn test_success_with_null_body() {
        let envelope = Envelope::ok(None);
        assert_eq!(
            envelope.to_json(),
            json!({"code": 200, "message": null, "body": null})
        );
    }

    #[test]
    fn test_failure_envelope_shape() {
        let error = ApiError::not_found("Chat 5 does not exist");
        let envelope = Envelope::failure(&error);
        assert_eq!(
            envelope.to_json(),
            json!({"code": 404, "message": "Chat 5 does not exist", "body": null})
        );
    }
}
