// Messages inside a chat. Windowed reads page by id (allocation order is
// creation order); rows are soft deleted.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::error::{ApiError, ErrorTemplate};
use crate::api::{Code, Project};
use crate::models::chat::{self, Chat};
use crate::models::user::{self, User};
use crate::store::store;
use crate::validation::{process, Validator};

pub mod errors {
    use super::*;

    pub const NOT_A_MEMBER: ErrorTemplate =
        ErrorTemplate::new("You are not a member of this chat", Code::Forbidden);
    pub const NOT_EXISTS: ErrorTemplate =
        ErrorTemplate::new("Message does not exist", Code::NotFound);
    pub const INVALID_TYPE: ErrorTemplate =
        ErrorTemplate::new("Invalid message type", Code::BadRequest);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MessageKind {
    Text,
    Image,
    File,
    System,
}

impl TryFrom<i64> for MessageKind {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageKind::Text),
            1 => Ok(MessageKind::Image),
            2 => Ok(MessageKind::File),
            3 => Ok(MessageKind::System),
            other => Err(format!("unknown message type {other}")),
        }
    }
}

impl From<MessageKind> for i64 {
    fn from(kind: MessageKind) -> i64 {
        match kind {
            MessageKind::Text => 0,
            MessageKind::Image => 1,
            MessageKind::File => 2,
            MessageKind::System => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Message {
    /// Lookup contract: resolve a live message or fail NotFound.
    pub fn index(message_id: i64) -> Result<Message, ApiError> {
        store()
            .message(message_id)
            .filter(|message| !message.is_deleted)
            .ok_or_else(|| errors::NOT_EXISTS.raise())
    }

    /// Only chat members post; posting bumps the chat's activity stamp.
    pub fn create(
        chat: &mut Chat,
        user: &User,
        kind: MessageKind,
        content: &str,
    ) -> Result<Message, ApiError> {
        if !chat.is_member(user) {
            return Err(errors::NOT_A_MEMBER.raise());
        }
        let (chat_id, user_id) = (chat.id, user.id);
        let content = content.to_string();
        let message = store().insert_message(|id| Message {
            id,
            chat_id,
            user_id,
            kind,
            content: content.clone(),
            created_at: Utc::now(),
            is_deleted: false,
        });
        chat.touch();
        Ok(message)
    }

    pub fn remove(&mut self) {
        self.is_deleted = true;
        store().save_message(self);
    }

    pub fn jsonl(&self) -> Value {
        Value::Object(self.project(&["id->message_id", "user", "type", "content", "created_at"]))
    }
}

impl Project for Message {
    fn computed(&self, field: &str) -> Option<Value> {
        match field {
            "user" => Some(
                User::index(self.user_id)
                    .map(|user| user.tiny())
                    .unwrap_or(Value::Null),
            ),
            "created_at" => Some(json!(self.created_at.timestamp() as f64)),
            _ => None,
        }
    }
}

/// Newest messages of a chat, newest first.
pub fn latest(chat_id: i64, limit: usize) -> Vec<Value> {
    window(chat_id, limit, |_| true, true)
}

/// Messages older than the cursor, newest first.
pub fn older(chat_id: i64, before: i64, limit: usize) -> Vec<Value> {
    window(chat_id, limit, move |id| id < before, true)
}

/// Messages newer than the cursor, oldest first.
pub fn newer(chat_id: i64, after: i64, limit: usize) -> Vec<Value> {
    window(chat_id, limit, move |id| id > after, false)
}

fn window(chat_id: i64, limit: usize, keep: impl Fn(i64) -> bool, newest_first: bool) -> Vec<Value> {
    let mut messages = store().select_messages(|message| {
        message.chat_id == chat_id && !message.is_deleted && keep(message.id)
    });
    if newest_first {
        messages.reverse();
    }
    messages.truncate(limit);
    messages.iter().map(Message::jsonl).collect()
}

/// Resolution step for validator chains: id to serialized message entity.
/// The owning chat's host rides along so ownership guards can check it
/// without another lookup.
pub fn index_step() -> impl Fn(Value) -> Result<Value, ApiError> + Send + Sync + 'static {
    |value| {
        let id = value
            .as_i64()
            .ok_or_else(|| crate::validation::errors::NOT_AN_INT.with(&[("value", &value)]))?;
        let message = Message::index(id)?;
        let mut resolved = serde_json::to_value(&message).unwrap_or(Value::Null);
        if let (Value::Object(map), Some(chat)) = (&mut resolved, store().chat(message.chat_id)) {
            map.insert("chat_host_id".to_string(), json!(chat.host_id));
        }
        Ok(resolved)
    }
}

pub struct MessageParams {
    pub message_id: Validator,
    pub chat_id: Validator,
    pub user_id: Validator,
    pub content: Validator,
    pub kind: Validator,
    pub limit: Validator,
    pub before: Validator,
    pub after: Validator,
}

pub static MESSAGE_PARAMS: Lazy<MessageParams> = Lazy::new(|| MessageParams {
    message_id: Validator::new("message_id")
        .rename("message")
        .to(process::int)
        .to(index_step()),
    chat_id: Validator::new("chat_id")
        .rename("chat")
        .to(process::int)
        .to(chat::index_step()),
    user_id: Validator::new("user_id")
        .rename("user")
        .to(process::int)
        .to(user::index_step(None)),
    content: Validator::new("content").to(process::string),
    kind: Validator::new("type")
        .to(process::int)
        .check(
            |value| value.as_i64().is_some_and(|n| MessageKind::try_from(n).is_ok()),
            errors::INVALID_TYPE,
        ),
    limit: Validator::new("limit")
        .to(process::int)
        .bool(
            |value| value.as_i64().is_some_and(|n| n >= 5),
            "limit should be greater than 5",
        )
        .bool(
            |value| value.as_i64().is_some_and(|n| n <= 100),
            "limit should be less than 100",
        ),
    before: Validator::new("before").to(process::int).nullable(),
    after: Validator::new("after").to(process::int).nullable(),
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{guest_login, host_login};
    use crate::validation::Validate;

    fn group_fixture(host_name: &str) -> (User, Vec<User>, Chat) {
        let host = host_login(host_name, "fixture-password").unwrap();
        let guests: Vec<User> = ["ga", "gb"]
            .iter()
            .map(|name| guest_login(name, "", &host).unwrap())
            .collect();
        let chat = Chat::create_group(&host, &guests).unwrap();
        (host, guests, chat)
    }

    #[test]
    fn test_only_members_can_post() {
        let (host, guests, mut chat) = group_fixture("msg-host-members");
        let outsider = host_login("msg-host-outsider", "fixture-password").unwrap();

        assert!(Message::create(&mut chat, &host, MessageKind::Text, "hi").is_ok());
        assert!(Message::create(&mut chat, &guests[0], MessageKind::Text, "yo").is_ok());

        let err = Message::create(&mut chat, &outsider, MessageKind::Text, "eh").unwrap_err();
        assert_eq!(err.code, Code::Forbidden);
        assert_eq!(err.message, "You are not a member of this chat");
    }

    #[test]
    fn test_windows_page_in_both_directions() {
        let (host, _, mut chat) = group_fixture("msg-host-window");
        let ids: Vec<i64> = (0..5)
            .map(|i| {
                Message::create(&mut chat, &host, MessageKind::Text, &format!("m{i}"))
                    .unwrap()
                    .id
            })
            .collect();

        let newest = latest(chat.id, 2);
        assert_eq!(newest[0]["message_id"], json!(ids[4]));
        assert_eq!(newest[1]["message_id"], json!(ids[3]));

        let earlier = older(chat.id, ids[2], 10);
        assert_eq!(earlier.len(), 2);
        assert_eq!(earlier[0]["message_id"], json!(ids[1]));

        let later = newer(chat.id, ids[2], 10);
        assert_eq!(later.len(), 2);
        assert_eq!(later[0]["message_id"], json!(ids[3]));
    }

    #[test]
    fn test_removed_messages_leave_windows_and_lookup() {
        let (host, _, mut chat) = group_fixture("msg-host-removed");
        let mut message = Message::create(&mut chat, &host, MessageKind::Text, "gone").unwrap();
        message.remove();

        assert!(latest(chat.id, 10).is_empty());
        let err = Message::index(message.id).unwrap_err();
        assert_eq!(err.message, "Message does not exist");
    }

    #[test]
    fn test_jsonl_projection_shape() {
        let (host, _, mut chat) = group_fixture("msg-host-jsonl");
        let message = Message::create(&mut chat, &host, MessageKind::Image, "pic").unwrap();
        let data = message.jsonl();
        assert_eq!(data.get("message_id"), Some(&json!(message.id)));
        assert!(data.get("id").is_none());
        assert_eq!(data.get("type"), Some(&json!(1)));
        assert_eq!(data["user"]["user_id"], json!(host.id));
        assert!(data.get("chat_id").is_none());
    }

    #[test]
    fn test_resolution_carries_chat_host() {
        let (host, _, mut chat) = group_fixture("msg-host-resolve");
        let message = Message::create(&mut chat, &host, MessageKind::Text, "hi").unwrap();
        let resolved = index_step()(json!(message.id)).unwrap();
        assert_eq!(resolved.get("chat_host_id"), Some(&json!(host.id)));
    }

    #[test]
    fn test_limit_param_bounds() {
        let limit = &MESSAGE_PARAMS.limit;
        assert_eq!(limit.apply(Some(json!("50"))).unwrap(), json!(50));
        assert_eq!(
            limit.apply(Some(json!(2))).unwrap_err().message,
            "limit should be greater than 5"
        );
        assert_eq!(
            limit.apply(Some(json!(500))).unwrap_err().message,
            "limit should be less than 100"
        );
    }

    #[test]
    fn test_kind_param_validates_range() {
        let kind = &MESSAGE_PARAMS.kind;
        assert_eq!(kind.apply(Some(json!(3))).unwrap(), json!(3));
        assert_eq!(kind.apply(Some(json!(9))).unwrap_err().message, "Invalid message type");
    }

    #[test]
    fn test_cursor_params_are_optional() {
        assert_eq!(MESSAGE_PARAMS.before.apply(None).unwrap(), Value::Null);
        assert_eq!(MESSAGE_PARAMS.after.apply(Some(json!("7"))).unwrap(), json!(7));
    }
}
