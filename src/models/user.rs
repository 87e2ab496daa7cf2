// Users: hosts own the tenancy, guests belong to exactly one host. Hosts
// log in by globally unique name; guests are scoped to their host and may
// run without a password until they set one.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::api::error::{ApiError, ErrorTemplate};
use crate::api::{Code, Project};
use crate::store::store;
use crate::validation::{process, Validator};

pub const OFFLINE_MIN_INTERVAL: u32 = 5; // minutes
pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const NAME_MAX_LENGTH: usize = 20;

pub mod errors {
    use super::*;

    pub const NOT_EXISTS: ErrorTemplate =
        ErrorTemplate::new("User ({attr}={value}) does not exist", Code::NotFound);
    pub const EXISTS: ErrorTemplate =
        ErrorTemplate::new("User already exists", Code::BadRequest);
    pub const EMPTY_NAME: ErrorTemplate =
        ErrorTemplate::new("Name cannot be empty", Code::BadRequest);
    pub const NAME_TOO_LONG: ErrorTemplate =
        ErrorTemplate::new("Name should be at most {name_length} characters long", Code::BadRequest);
    pub const INTERVAL_TOO_SMALL: ErrorTemplate = ErrorTemplate::new(
        "Interval should be greater than {offline_interval} minutes",
        Code::BadRequest,
    );
    pub const PASSWORD_TOO_SHORT: ErrorTemplate = ErrorTemplate::new(
        "Password should be at least {password_length} characters long",
        Code::BadRequest,
    );
    pub const PASSWORD_ERROR: ErrorTemplate =
        ErrorTemplate::new("Password error", Code::BadRequest);
    pub const SPACE_IN_NAME: ErrorTemplate =
        ErrorTemplate::new("Name cannot contain spaces", Code::BadRequest);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Host,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Unset,
    Email,
    Sms,
    Bark,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub role: UserRole,
    pub name: String,
    pub lower_name: String,
    /// Host binding; None for hosts themselves.
    pub host_id: Option<i64>,
    /// SHA-256 of password+salt; None until a guest sets a password.
    pub password: Option<String>,
    pub salt: String,
    pub offline_notification_interval: u32,
    pub notification_channel: NotificationChannel,
    pub is_online: bool,
    pub last_heartbeat: DateTime<Utc>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bark: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Lookup contract: resolve a live user by id or fail NotFound.
    pub fn index(user_id: i64) -> Result<User, ApiError> {
        store()
            .user(user_id)
            .ok_or_else(|| errors::NOT_EXISTS.with(&[("attr", &"user id"), ("value", &user_id)]))
    }

    pub fn is_guest(&self) -> bool {
        self.role == UserRole::Guest
    }

    /// Seen within the offline interval.
    pub fn is_alive(&self) -> bool {
        (Utc::now() - self.last_heartbeat).num_seconds() < (OFFLINE_MIN_INTERVAL as i64) * 60
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Utc::now();
        store().save_user(self);
    }

    /// Minimal projection embedded in chats, messages, and token payloads.
    pub fn tiny(&self) -> Value {
        Value::Object(self.project(&["name", "user_id", "is_alive", "guest"]))
    }
}

impl Project for User {
    fn computed(&self, field: &str) -> Option<Value> {
        match field {
            "user_id" => Some(Value::from(self.id)),
            "is_alive" => Some(Value::from(self.is_alive())),
            "guest" => Some(Value::from(self.is_guest())),
            _ => None,
        }
    }
}

/// Host login: first login with an unused name registers the host, later
/// logins verify the password.
pub fn host_login(name: &str, password: &str) -> Result<User, ApiError> {
    let lower = name.to_lowercase();
    match store().find_user(|user| user.role == UserRole::Host && user.lower_name == lower) {
        Some(user) => {
            if !verify_password(password, &user.salt, user.password.as_deref()) {
                return Err(errors::PASSWORD_ERROR.raise());
            }
            Ok(user)
        }
        None => create_host(name, password),
    }
}

/// Guest login, scoped to one host: first login registers the guest; a
/// non-empty password is stored on first use and verified afterwards.
pub fn guest_login(name: &str, password: &str, host: &User) -> Result<User, ApiError> {
    let lower = name.to_lowercase();
    let host_id = host.id;
    match store().find_user(|user| {
        user.role == UserRole::Guest && user.host_id == Some(host_id) && user.lower_name == lower
    }) {
        Some(user) => {
            if !verify_password(password, &user.salt, user.password.as_deref()) {
                return Err(errors::PASSWORD_ERROR.raise());
            }
            Ok(user)
        }
        None => {
            let mut guest = create_guest(name, host)?;
            set_password(&mut guest, password)?;
            Ok(guest)
        }
    }
}

fn create_host(name: &str, password: &str) -> Result<User, ApiError> {
    validate_name(name)?;
    validate_password(password)?;
    let lower = name.to_lowercase();
    if store()
        .find_user(|user| user.role == UserRole::Host && user.lower_name == lower)
        .is_some()
    {
        return Err(errors::EXISTS.raise());
    }
    let salt = generate_salt();
    let hash = hash_password(password, &salt);
    Ok(store().insert_user(|id| blank_user(id, UserRole::Host, name, None, Some(hash), salt)))
}

fn create_guest(name: &str, host: &User) -> Result<User, ApiError> {
    validate_name(name)?;
    let lower = name.to_lowercase();
    let host_id = host.id;
    if store()
        .find_user(|user| {
            user.role == UserRole::Guest && user.host_id == Some(host_id) && user.lower_name == lower
        })
        .is_some()
    {
        return Err(errors::EXISTS.raise());
    }
    let salt = generate_salt();
    Ok(store().insert_user(|id| blank_user(id, UserRole::Guest, name, Some(host_id), None, salt)))
}

/// No-op on an empty password so guests can stay passwordless.
pub fn set_password(user: &mut User, password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Ok(());
    }
    validate_password(password)?;
    user.password = Some(hash_password(password, &user.salt));
    store().save_user(user);
    Ok(())
}

fn blank_user(
    id: i64,
    role: UserRole,
    name: &str,
    host_id: Option<i64>,
    password: Option<String>,
    salt: String,
) -> User {
    let now = Utc::now();
    User {
        id,
        role,
        name: name.to_string(),
        lower_name: name.to_lowercase(),
        host_id,
        password,
        salt,
        offline_notification_interval: OFFLINE_MIN_INTERVAL,
        notification_channel: NotificationChannel::Unset,
        is_online: false,
        last_heartbeat: now,
        email: None,
        phone: None,
        bark: None,
        created_at: now,
    }
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim() != name {
        return Err(errors::SPACE_IN_NAME.raise());
    }
    if name.is_empty() {
        return Err(errors::EMPTY_NAME.raise());
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(errors::NAME_TOO_LONG.with(&[("name_length", &NAME_MAX_LENGTH)]));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < PASSWORD_MIN_LENGTH {
        return Err(errors::PASSWORD_TOO_SHORT.with(&[("password_length", &PASSWORD_MIN_LENGTH)]));
    }
    Ok(())
}

pub fn validate_offline_interval(minutes: u32) -> Result<(), ApiError> {
    if minutes < OFFLINE_MIN_INTERVAL {
        return Err(errors::INTERVAL_TOO_SMALL.with(&[("offline_interval", &OFFLINE_MIN_INTERVAL)]));
    }
    Ok(())
}

fn generate_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

fn hash_password(password: &str, salt: &str) -> String {
    let digest = Sha256::digest(format!("{password}{salt}").as_bytes());
    format!("{digest:x}")
}

/// An empty submitted password skips verification entirely, which is what
/// lets passwordless guests in.
fn verify_password(password: &str, salt: &str, stored: Option<&str>) -> bool {
    if password.is_empty() {
        return true;
    }
    stored == Some(hash_password(password, salt).as_str())
}

/// Resolution step for validator chains: id to serialized user entity,
/// optionally constrained to one role. A wrong-role id resolves to nothing.
pub fn index_step(
    role: Option<UserRole>,
) -> impl Fn(Value) -> Result<Value, ApiError> + Send + Sync + 'static {
    move |value| {
        let id = value
            .as_i64()
            .ok_or_else(|| crate::validation::errors::NOT_AN_INT.with(&[("value", &value)]))?;
        let user = User::index(id)?;
        if role.is_some_and(|required| user.role != required) {
            return Err(errors::NOT_EXISTS.with(&[("attr", &"user id"), ("value", &id)]));
        }
        Ok(serde_json::to_value(&user).unwrap_or(Value::Null))
    }
}

pub struct BaseUserParams {
    pub name: Validator,
    pub password: Validator,
    pub user_id: Validator,
}

pub struct HostUserParams {
    pub name: Validator,
    pub password: Validator,
    pub user_id: Validator,
}

pub struct GuestUserParams {
    pub name: Validator,
    pub password: Validator,
    pub user_id: Validator,
    pub host_id: Validator,
}

pub static BASE_USER_PARAMS: Lazy<BaseUserParams> = Lazy::new(|| BaseUserParams {
    name: Validator::new("name").to(process::string),
    password: Validator::new("password").to(process::string),
    user_id: Validator::new("user_id")
        .rename("user")
        .to(process::int)
        .to(index_step(None)),
});

pub static HOST_USER_PARAMS: Lazy<HostUserParams> = Lazy::new(|| HostUserParams {
    name: BASE_USER_PARAMS.name.copy(),
    password: BASE_USER_PARAMS.password.copy(),
    user_id: Validator::new("user_id")
        .rename("user")
        .to(process::int)
        .to(index_step(Some(UserRole::Host))),
});

pub static GUEST_USER_PARAMS: Lazy<GuestUserParams> = Lazy::new(|| GuestUserParams {
    name: BASE_USER_PARAMS.name.copy(),
    // Guests may log in without a password
    password: BASE_USER_PARAMS.password.copy().nullable(),
    user_id: Validator::new("user_id")
        .rename("user")
        .to(process::int)
        .to(index_step(Some(UserRole::Guest))),
    host_id: Validator::new("host_id")
        .rename("host")
        .to(process::int)
        .to(index_step(Some(UserRole::Host))),
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Validate;
    use serde_json::json;

    #[test]
    fn test_host_login_registers_then_verifies() {
        let host = host_login("Margaret", "hamilton").unwrap();
        assert_eq!(host.role, UserRole::Host);
        assert_eq!(host.lower_name, "margaret");

        let again = host_login("margaret", "hamilton").unwrap();
        assert_eq!(again.id, host.id);

        let err = host_login("Margaret", "wrong-password").unwrap_err();
        assert_eq!(err.message, "Password error");
    }

    #[test]
    fn test_host_password_rules_apply_on_registration() {
        let err = host_login("Shannon", "abc").unwrap_err();
        assert_eq!(err.message, "Password should be at least 6 characters long");
        assert!(host_login(" padded ", "secret1").is_err());
        assert!(host_login("", "secret1").is_err());
    }

    #[test]
    fn test_guest_names_are_scoped_per_host() {
        let host_a = host_login("Lovelace", "enchantress").unwrap();
        let host_b = host_login("Babbage", "difference").unwrap();

        let guest_a = guest_login("ada", "", &host_a).unwrap();
        let guest_b = guest_login("ada", "", &host_b).unwrap();
        assert_ne!(guest_a.id, guest_b.id);
        assert_eq!(guest_a.host_id, Some(host_a.id));
    }

    #[test]
    fn test_passwordless_guest_can_return_then_set_password() {
        let host = host_login("Hopper", "cobol-rules").unwrap();
        let guest = guest_login("grace", "", &host).unwrap();
        assert!(guest.password.is_none());

        // Passwordless guests get in with any submitted password omitted
        let mut guest = guest_login("grace", "", &host).unwrap();
        set_password(&mut guest, "compilers").unwrap();
        assert!(guest_login("grace", "compilers", &host).is_ok());
        assert!(guest_login("grace", "interpreters", &host).is_err());
    }

    #[test]
    fn test_index_not_found_message() {
        let err = User::index(999_999).unwrap_err();
        assert_eq!(err.code, Code::NotFound);
        assert_eq!(err.message, "User (user id=999999) does not exist");
    }

    #[test]
    fn test_tiny_projection_shape() {
        let host = host_login("Liskov", "substitution").unwrap();
        let tiny = host.tiny();
        assert_eq!(tiny.get("name"), Some(&json!("Liskov")));
        assert_eq!(tiny.get("user_id"), Some(&json!(host.id)));
        assert_eq!(tiny.get("guest"), Some(&json!(false)));
        assert!(tiny.get("is_alive").is_some());
        assert!(tiny.get("password").is_none());
    }

    #[test]
    fn test_role_constrained_index_step_rejects_wrong_role() {
        let host = host_login("Perlis", "epigrams").unwrap();
        let step = index_step(Some(UserRole::Guest));
        let err = step(json!(host.id)).unwrap_err();
        assert_eq!(err.code, Code::NotFound);

        let any = index_step(None);
        let resolved = any(json!(host.id)).unwrap();
        assert_eq!(resolved.get("id"), Some(&json!(host.id)));
    }

    #[test]
    fn test_guest_param_password_is_nullable() {
        assert_eq!(GUEST_USER_PARAMS.password.apply(None).unwrap(), Value::Null);
        assert!(HOST_USER_PARAMS.password.apply(None).is_err());
    }

    #[test]
    fn test_offline_interval_floor() {
        let err = validate_offline_interval(2).unwrap_err();
        assert_eq!(err.message, "Interval should be greater than 5 minutes");
        assert!(validate_offline_interval(10).is_ok());
    }
}
