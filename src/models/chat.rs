// Chats: every guest has one single chat with their host; group chats
// gather several guests of the same host under a name. Rows are soft
// deleted so message history stays resolvable.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::error::{ApiError, ErrorTemplate};
use crate::api::{Code, Project};
use crate::models::user::{self, User, UserRole};
use crate::store::store;
use crate::validation::{process, ListValidator, Validator};

pub mod errors {
    use super::*;

    pub const GROUP_CHAT_EMPTY: ErrorTemplate =
        ErrorTemplate::new("Cannot create an empty group chat", Code::BadRequest);
    pub const GROUP_CHAT_TOO_SMALL: ErrorTemplate =
        ErrorTemplate::new("Group chat should have at least 3 members", Code::BadRequest);
    pub const UNALIGNED_HOST: ErrorTemplate = ErrorTemplate::new(
        "All members of a group chat should have the same host",
        Code::BadRequest,
    );
    pub const NOT_MEMBER: ErrorTemplate = ErrorTemplate::new(
        "Guest {guest} is not a member of the group chat {chat}",
        Code::BadRequest,
    );
    pub const NOT_EXISTS: ErrorTemplate =
        ErrorTemplate::new("Chat {chat} does not exist", Code::NotFound);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatScheme {
    Single,
    Group,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub scheme: ChatScheme,
    pub host_id: i64,
    /// The one guest of a single chat.
    pub guest_id: Option<i64>,
    /// Members of a group chat.
    pub guest_ids: Vec<i64>,
    /// Group chats carry a display name.
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_chat_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Chat {
    /// Lookup contract: resolve a live (non-deleted) chat or fail NotFound.
    pub fn index(chat_id: i64) -> Result<Chat, ApiError> {
        store()
            .chat(chat_id)
            .filter(|chat| !chat.is_deleted)
            .ok_or_else(|| errors::NOT_EXISTS.with(&[("chat", &chat_id)]))
    }

    pub fn is_group(&self) -> bool {
        self.scheme == ChatScheme::Group
    }

    pub fn is_member(&self, user: &User) -> bool {
        user.id == self.host_id
            || self.guest_id == Some(user.id)
            || self.guest_ids.contains(&user.id)
    }

    /// One single chat per guest, created on first need.
    pub fn single_get_or_create(guest: &User, host: &User) -> Chat {
        let guest_id = guest.id;
        if let Some(chat) = store().find_chat(|chat| {
            chat.scheme == ChatScheme::Single && chat.guest_id == Some(guest_id) && !chat.is_deleted
        }) {
            return chat;
        }
        let host_id = host.id;
        store().insert_chat(|id| blank_chat(id, ChatScheme::Single, host_id, Some(guest_id), vec![], None))
    }

    /// Group chat creation; all guests must belong to the creating host.
    pub fn create_group(host: &User, guests: &[User]) -> Result<Chat, ApiError> {
        if guests.is_empty() {
            return Err(errors::GROUP_CHAT_EMPTY.raise());
        }
        if guests.len() == 1 {
            return Err(errors::GROUP_CHAT_TOO_SMALL.raise());
        }
        for guest in guests {
            if guest.host_id != Some(host.id) {
                return Err(errors::UNALIGNED_HOST.raise());
            }
        }

        let members = guests.len() + 1;
        let name = format!("Group Chat ({members})");
        let host_id = host.id;
        let guest_ids: Vec<i64> = guests.iter().map(|guest| guest.id).collect();
        Ok(store().insert_chat(|id| {
            blank_chat(id, ChatScheme::Group, host_id, None, guest_ids.clone(), Some(name.clone()))
        }))
    }

    pub fn rename(&mut self, name: &str) {
        self.name = Some(name.to_string());
        store().save_chat(self);
    }

    pub fn remove(&mut self) {
        self.is_deleted = true;
        store().save_chat(self);
    }

    pub fn add_guest(&mut self, guest: &User) -> Result<(), ApiError> {
        if guest.host_id != Some(self.host_id) {
            return Err(errors::UNALIGNED_HOST.raise());
        }
        if !self.guest_ids.contains(&guest.id) {
            self.guest_ids.push(guest.id);
            store().save_chat(self);
        }
        Ok(())
    }

    pub fn remove_guest(&mut self, guest: &User) -> Result<(), ApiError> {
        if !self.guest_ids.contains(&guest.id) {
            return Err(errors::NOT_MEMBER.with(&[
                ("guest", &guest.name),
                ("chat", &self.name.as_deref().unwrap_or("")),
            ]));
        }
        self.guest_ids.retain(|id| *id != guest.id);
        store().save_chat(self);
        Ok(())
    }

    /// Bump the activity timestamp when a message lands.
    pub fn touch(&mut self) {
        self.last_chat_at = Utc::now();
        store().save_chat(self);
    }

    pub fn json(&self) -> Value {
        let fields: &[&str] = if self.is_group() {
            &["host", "guests", "name", "created_at", "last_chat_at", "group", "id->chat_id"]
        } else {
            &["host", "guest", "created_at", "last_chat_at", "group", "id->chat_id"]
        };
        Value::Object(self.project(fields))
    }
}

impl Project for Chat {
    fn computed(&self, field: &str) -> Option<Value> {
        match field {
            "host" => Some(tiny_user(self.host_id)),
            "guest" => Some(self.guest_id.map(tiny_user).unwrap_or(Value::Null)),
            "guests" => Some(Value::Array(
                self.guest_ids.iter().map(|id| tiny_user(*id)).collect(),
            )),
            "created_at" => Some(json!(self.created_at.timestamp() as f64)),
            "last_chat_at" => Some(json!(self.last_chat_at.timestamp() as f64)),
            "group" => Some(Value::from(self.is_group())),
            _ => None,
        }
    }
}

fn tiny_user(user_id: i64) -> Value {
    User::index(user_id).map(|user| user.tiny()).unwrap_or(Value::Null)
}

fn blank_chat(
    id: i64,
    scheme: ChatScheme,
    host_id: i64,
    guest_id: Option<i64>,
    guest_ids: Vec<i64>,
    name: Option<String>,
) -> Chat {
    let now = Utc::now();
    Chat {
        id,
        scheme,
        host_id,
        guest_id,
        guest_ids,
        name,
        created_at: now,
        last_chat_at: now,
        is_deleted: false,
    }
}

/// Chats a host oversees / a guest takes part in, projected for listing.
pub fn chat_list(user: &User) -> Vec<Value> {
    let user_id = user.id;
    let chats = match user.role {
        UserRole::Host => store().select_chats(|chat| chat.host_id == user_id && !chat.is_deleted),
        UserRole::Guest => store().select_chats(|chat| {
            !chat.is_deleted
                && (chat.guest_id == Some(user_id) || chat.guest_ids.contains(&user_id))
        }),
    };
    chats.iter().map(Chat::json).collect()
}

/// Resolution step for validator chains: id to serialized chat entity.
pub fn index_step() -> impl Fn(Value) -> Result<Value, ApiError> + Send + Sync + 'static {
    |value| {
        let id = value
            .as_i64()
            .ok_or_else(|| crate::validation::errors::NOT_AN_INT.with(&[("value", &value)]))?;
        let chat = Chat::index(id)?;
        Ok(serde_json::to_value(&chat).unwrap_or(Value::Null))
    }
}

fn unique_guests(items: &[Value]) -> bool {
    let mut seen = std::collections::HashSet::new();
    items
        .iter()
        .all(|item| seen.insert(item.get("id").and_then(Value::as_i64)))
}

pub struct BaseChatParams {
    pub chat_id: Validator,
}

pub struct GroupChatParams {
    pub chat_id: Validator,
    pub name: Validator,
    pub guests: ListValidator,
}

pub static BASE_CHAT_PARAMS: Lazy<BaseChatParams> = Lazy::new(|| BaseChatParams {
    chat_id: Validator::new("chat_id")
        .rename("chat")
        .to(process::int)
        .to(index_step()),
});

pub static GROUP_CHAT_PARAMS: Lazy<GroupChatParams> = Lazy::new(|| GroupChatParams {
    // Inherited resolver, narrowed to group chats
    chat_id: BASE_CHAT_PARAMS
        .chat_id
        .copy()
        .bool(|chat| chat.get("scheme") == Some(&json!("group")), "not a group chat"),
    name: Validator::new("name").to(process::string),
    guests: ListValidator::new("guests")
        .element(Validator::new("guest").to(process::int).to(user::index_step(Some(UserRole::Guest))))
        .bool(unique_guests, "duplicated guests"),
});
