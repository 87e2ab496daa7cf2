// API error channel: every failure in the request pipeline - validation,
// lookup, authorization, business rule - is an ApiError with one Code and
// one resolved message. Domain modules declare const ErrorTemplate catalogs
// and bind placeholder values at raise time.

use std::fmt;

use axum::response::{IntoResponse, Response};

use crate::api::code::Code;
use crate::api::envelope::Envelope;

/// A registered error shape: a message template with named `{placeholder}`s
/// and the Code it carries. Templates are `const`-constructible so domain
/// catalogs can live in statics, built once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorTemplate {
    code: Code,
    template: &'static str,
}

impl ErrorTemplate {
    pub const fn new(template: &'static str, code: Code) -> Self {
        Self { code, template }
    }

    pub const fn bad_request(template: &'static str) -> Self {
        Self::new(template, Code::BadRequest)
    }

    pub const fn forbidden(template: &'static str) -> Self {
        Self::new(template, Code::Forbidden)
    }

    pub const fn code(&self) -> Code {
        self.code
    }

    pub const fn template(&self) -> &'static str {
        self.template
    }

    /// Raise with the template text verbatim (no placeholders to bind).
    pub fn raise(&self) -> ApiError {
        ApiError {
            code: self.code,
            message: self.template.to_string(),
        }
    }

    /// Raise with placeholder values bound into the message.
    pub fn with(&self, args: &[(&str, &dyn fmt::Display)]) -> ApiError {
        ApiError {
            code: self.code,
            message: render(self.template, args),
        }
    }
}

/// A raised failure: exactly one Code and a fully-resolved message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: Code,
    pub message: String,
}

impl ApiError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Code::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(Code::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Envelope::failure(&self).into_response()
    }
}

fn render(template: &str, args: &[(&str, &dyn fmt::Display)]) -> String {
    let mut message = template.to_string();
    for (name, value) in args {
        message = message.replace(&format!("{{{name}}}"), &value.to_string());
    }
    message
}
