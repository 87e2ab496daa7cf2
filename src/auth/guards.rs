// Authorization guards. Each one reads relationships the extraction stages
// already resolved into the request context - guards never query storage.
// The names in `requires` are what the pipeline builder checks against the
// stage order.

use serde_json::Value;

use crate::pipeline::{Guard, RequestContext};

pub fn require_chat_owner() -> Guard {
    Guard::new(
        "chat_owner",
        &["user", "chat"],
        is_chat_host,
        "You are not the owner of this chat",
    )
}

pub fn require_single_chat_member() -> Guard {
    Guard::new(
        "single_chat_member",
        &["user", "chat"],
        is_single_chat_member,
        "You are not a member of this chat",
    )
}

pub fn require_group_chat_member() -> Guard {
    Guard::new(
        "group_chat_member",
        &["user", "chat"],
        is_group_chat_member,
        "You are not a member of this chat",
    )
}

pub fn require_chat_member() -> Guard {
    Guard::new(
        "chat_member",
        &["user", "chat"],
        is_chat_member,
        "You are not a member of this chat",
    )
}

pub fn require_message_owner() -> Guard {
    Guard::new(
        "message_owner",
        &["user", "message"],
        is_message_owner,
        "You are not the owner of this message",
    )
}

fn principal_id(ctx: &RequestContext) -> Option<i64> {
    ctx.principal().map(|user| user.id)
}

fn field_i64(ctx: &RequestContext, name: &str, key: &str) -> Option<i64> {
    ctx.data(name)?.get(key)?.as_i64()
}

fn is_chat_host(ctx: &RequestContext) -> bool {
    principal_id(ctx).is_some() && principal_id(ctx) == field_i64(ctx, "chat", "host_id")
}

fn is_single_chat_guest(ctx: &RequestContext) -> bool {
    principal_id(ctx).is_some() && principal_id(ctx) == field_i64(ctx, "chat", "guest_id")
}

fn is_group_chat_guest(ctx: &RequestContext) -> bool {
    let Some(user_id) = principal_id(ctx) else {
        return false;
    };
    ctx.data("chat")
        .and_then(|chat| chat.get("guest_ids"))
        .and_then(Value::as_array)
        .is_some_and(|ids| ids.iter().any(|id| id.as_i64() == Some(user_id)))
}

fn is_single_chat_member(ctx: &RequestContext) -> bool {
    is_chat_host(ctx) || is_single_chat_guest(ctx)
}

fn is_group_chat_member(ctx: &RequestContext) -> bool {
    is_chat_host(ctx) || is_group_chat_guest(ctx)
}

fn scheme(ctx: &RequestContext) -> Option<&str> {
    ctx.data("chat")?.get("scheme")?.as_str()
}

fn is_chat_member(ctx: &RequestContext) -> bool {
    is_chat_host(ctx)
        || (scheme(ctx) == Some("single") && is_single_chat_guest(ctx))
        || (scheme(ctx) == Some("group") && is_group_chat_guest(ctx))
}

fn is_message_owner(ctx: &RequestContext) -> bool {
    let user_id = principal_id(ctx);
    user_id.is_some()
        && (user_id == field_i64(ctx, "message", "user_id")
            || user_id == field_i64(ctx, "message", "chat_host_id"))
}
