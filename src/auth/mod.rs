// Credential handling: HS256-signed token payloads with an explicit
// issue-time/expiry policy enforced here, not by the JWT library. The
// decoded payload is type-checked before anything trusts its contents.

pub mod guards;

use std::collections::HashSet;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Map, Value};

use crate::api::error::{ApiError, ErrorTemplate};
use crate::api::Code;
use crate::config;
use crate::models::user::{User, UserRole};
use crate::validation::{DictValidator, Validator};

pub const TIME: &str = "time";
pub const EXPIRE: &str = "expire";

pub mod errors {
    use super::*;

    pub const EXPIRED: ErrorTemplate = ErrorTemplate::new("Token expired", Code::Unauthorized);
    pub const SIGNATURE: ErrorTemplate =
        ErrorTemplate::new("Invalid token signature", Code::Unauthorized);
    pub const FORMAT: ErrorTemplate =
        ErrorTemplate::new("Incorrect format: {details}", Code::BadRequest);
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token generation error: {0}")]
    Generation(String),
    #[error("token secret not configured")]
    MissingSecret,
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

/// Stamp issue time and expiry into the payload and sign it. Returns the
/// credential alongside the stamped payload, which is what login responses
/// hand to clients.
pub fn encrypt(mut payload: Map<String, Value>, expire_secs: u64) -> Result<Value, TokenError> {
    payload.insert(TIME.to_string(), json!(now_epoch()));
    payload.insert(EXPIRE.to_string(), json!(expire_secs));
    let token = sign(&payload)?;
    Ok(json!({ "auth": token, "data": payload }))
}

/// Verify a credential and return its payload. Decode failures are
/// malformed input; a structurally sound payload is still type-checked
/// before the expiry policy runs against it.
pub fn decrypt(token: &str) -> Result<Map<String, Value>, ApiError> {
    let secret = &config::config().security.token_secret;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims = HashSet::new();

    let decoded = decode::<Map<String, Value>>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::InvalidSignature => errors::SIGNATURE.raise(),
        _ => errors::FORMAT.with(&[("details", &err)]),
    })?;
    let payload = decoded.claims;

    payload_validator().clean(&payload)?;

    let time = payload.get(TIME).and_then(Value::as_f64).unwrap_or(0.0);
    let expire = payload.get(EXPIRE).and_then(Value::as_u64).unwrap_or(0);
    if now_epoch() > time + expire as f64 {
        return Err(errors::EXPIRED.raise());
    }
    Ok(payload)
}

/// Issue the login credential for a user; the payload is the user's tiny
/// projection, which carries the id the auth stage resolves by.
pub fn login_token(user: &User) -> Result<Value, ApiError> {
    let payload = match user.tiny() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Ok(encrypt(payload, config::config().security.token_expiry_secs)?)
}

/// Authentication stage: bearer header to resolved principal, optionally
/// constrained to one role.
pub fn authenticate(header: Option<&str>, required: Option<UserRole>) -> Result<User, ApiError> {
    let header =
        header.ok_or_else(|| errors::FORMAT.with(&[("details", &"Missing authorization header")]))?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| errors::FORMAT.with(&[("details", &"Invalid authorization header")]))?;

    let payload = decrypt(token)?;
    let user_id = payload
        .get("user_id")
        .and_then(Value::as_i64)
        .ok_or_else(|| errors::FORMAT.with(&[("details", &"Invalid token payload")]))?;
    let user = User::index(user_id)?;

    if required.is_some_and(|role| user.role != role) {
        return Err(errors::FORMAT.with(&[("details", &"Invalid user role")]));
    }
    Ok(user)
}

fn payload_validator() -> DictValidator {
    DictValidator::new().fields([
        Validator::new(EXPIRE).bool(|v| v.is_u64(), "Invalid token expire"),
        Validator::new(TIME).bool(|v| v.is_f64(), "Invalid token time"),
    ])
}

fn sign(payload: &Map<String, Value>) -> Result<String, TokenError> {
    let secret = &config::config().security.token_secret;
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }
    encode(
        &Header::default(),
        payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| TokenError::Generation(err.to_string()))
}

fn now_epoch() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}
