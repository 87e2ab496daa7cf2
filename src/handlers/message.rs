use std::collections::HashMap;

use axum::extract::Query;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::api::{respond, HandlerResult};
use crate::auth::guards;
use crate::models::chat::Chat;
use crate::models::message::{self, Message, MessageKind, MESSAGE_PARAMS};
use crate::pipeline::{rule, Pipeline, RequestContext};

use super::raw_request;

static MESSAGE_LIST: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("message_list")
        .require_user()
        .query(vec![
            rule(&MESSAGE_PARAMS.chat_id),
            rule(&MESSAGE_PARAMS.limit),
            rule(&MESSAGE_PARAMS.before),
            rule(&MESSAGE_PARAMS.after),
        ])
        .guard(guards::require_chat_member())
        .handle(message_list_handler)
});

fn message_list_handler(ctx: &RequestContext) -> HandlerResult {
    let chat: Chat = ctx.value("chat")?;
    let limit: usize = ctx.value("limit")?;
    let before: Option<i64> = ctx.value("before")?;
    let after: Option<i64> = ctx.value("after")?;

    let window = if let Some(before) = before {
        message::older(chat.id, before, limit)
    } else if let Some(after) = after {
        message::newer(chat.id, after, limit)
    } else {
        message::latest(chat.id, limit)
    };
    Ok(Some(Value::Array(window)))
}

static MESSAGE_CREATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("message_create")
        .require_user()
        .query(vec![rule(&MESSAGE_PARAMS.chat_id)])
        .body(vec![
            rule(&MESSAGE_PARAMS.content),
            rule(&MESSAGE_PARAMS.kind),
        ])
        .guard(guards::require_group_chat_member())
        .handle(message_create_handler)
});

fn message_create_handler(ctx: &RequestContext) -> HandlerResult {
    let mut chat: Chat = ctx.value("chat")?;
    let user = ctx.require_principal()?;
    let kind: MessageKind = ctx.value("type")?;
    let content: String = ctx.value("content")?;

    let message = Message::create(&mut chat, user, kind, &content)?;
    Ok(Some(message.jsonl()))
}

static MESSAGE_REMOVE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("message_remove")
        .require_user()
        .query(vec![rule(&MESSAGE_PARAMS.message_id)])
        .guard(guards::require_message_owner())
        .handle(message_remove_handler)
});

fn message_remove_handler(ctx: &RequestContext) -> HandlerResult {
    let mut message: Message = ctx.value("message")?;
    message.remove();
    Ok(None)
}

pub async fn message_get(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(MESSAGE_LIST.run(&raw_request(&headers, query, None)))
}

pub async fn message_post(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Response {
    respond(MESSAGE_CREATE.run(&raw_request(&headers, query, body.map(|Json(value)| value))))
}

pub async fn message_delete(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(MESSAGE_REMOVE.run(&raw_request(&headers, query, None)))
}
