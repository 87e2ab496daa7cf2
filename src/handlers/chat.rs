use std::collections::HashMap;

use axum::extract::Query;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::api::{respond, HandlerResult};
use crate::auth::guards;
use crate::models::chat::{self, Chat, BASE_CHAT_PARAMS, GROUP_CHAT_PARAMS};
use crate::models::user::{User, UserRole, GUEST_USER_PARAMS};
use crate::pipeline::{rule, Pipeline, RequestContext};

use super::raw_request;

static CHAT_LIST: Lazy<Pipeline> =
    Lazy::new(|| Pipeline::named("chat_list").require_user().handle(chat_list_handler));

fn chat_list_handler(ctx: &RequestContext) -> HandlerResult {
    let user = ctx.require_principal()?;
    Ok(Some(Value::Array(chat::chat_list(user))))
}

static GROUP_CHAT_CREATE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("group_chat_create")
        .require_role(UserRole::Host)
        .body(vec![rule(&GROUP_CHAT_PARAMS.guests)])
        .handle(group_chat_create_handler)
});

fn group_chat_create_handler(ctx: &RequestContext) -> HandlerResult {
    let host = ctx.require_principal()?;
    let guests: Vec<User> = ctx.value("guests")?;
    let chat = Chat::create_group(host, &guests)?;
    Ok(Some(chat.json()))
}

static GROUP_CHAT_REMOVE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("group_chat_remove")
        .require_role(UserRole::Host)
        .query(vec![rule(&GROUP_CHAT_PARAMS.chat_id)])
        .guard(guards::require_chat_owner())
        .handle(group_chat_remove_handler)
});

fn group_chat_remove_handler(ctx: &RequestContext) -> HandlerResult {
    let mut chat: Chat = ctx.value("chat")?;
    chat.remove();
    Ok(None)
}

static GROUP_CHAT_RENAME: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("group_chat_rename")
        .require_role(UserRole::Host)
        .query(vec![rule(&BASE_CHAT_PARAMS.chat_id)])
        .body(vec![rule(&GROUP_CHAT_PARAMS.name)])
        .guard(guards::require_chat_owner())
        .handle(group_chat_rename_handler)
});

fn group_chat_rename_handler(ctx: &RequestContext) -> HandlerResult {
    let mut chat: Chat = ctx.value("chat")?;
    let name: String = ctx.value("name")?;
    chat.rename(&name);
    Ok(Some(chat.json()))
}

static GROUP_CHAT_GUEST_ADD: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("group_chat_guest_add")
        .require_role(UserRole::Host)
        .query(vec![
            rule(&GROUP_CHAT_PARAMS.chat_id),
            rule(&GUEST_USER_PARAMS.user_id),
        ])
        .guard(guards::require_chat_owner())
        .handle(group_chat_guest_add_handler)
});

fn group_chat_guest_add_handler(ctx: &RequestContext) -> HandlerResult {
    let mut chat: Chat = ctx.value("chat")?;
    let guest: User = ctx.value("user")?;
    chat.add_guest(&guest)?;
    Ok(Some(chat.json()))
}

static GROUP_CHAT_GUEST_REMOVE: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("group_chat_guest_remove")
        .require_role(UserRole::Host)
        .query(vec![
            rule(&GROUP_CHAT_PARAMS.chat_id),
            rule(&GUEST_USER_PARAMS.user_id),
        ])
        .guard(guards::require_chat_owner())
        .handle(group_chat_guest_remove_handler)
});

fn group_chat_guest_remove_handler(ctx: &RequestContext) -> HandlerResult {
    let mut chat: Chat = ctx.value("chat")?;
    let guest: User = ctx.value("user")?;
    chat.remove_guest(&guest)?;
    Ok(Some(chat.json()))
}

pub async fn chat_list_get(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(CHAT_LIST.run(&raw_request(&headers, query, None)))
}

pub async fn group_chat_post(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Response {
    respond(GROUP_CHAT_CREATE.run(&raw_request(&headers, query, body.map(|Json(value)| value))))
}

pub async fn group_chat_delete(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(GROUP_CHAT_REMOVE.run(&raw_request(&headers, query, None)))
}

pub async fn group_chat_name_post(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Response {
    respond(GROUP_CHAT_RENAME.run(&raw_request(&headers, query, body.map(|Json(value)| value))))
}

pub async fn group_chat_guest_put(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(GROUP_CHAT_GUEST_ADD.run(&raw_request(&headers, query, None)))
}

pub async fn group_chat_guest_delete(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(GROUP_CHAT_GUEST_REMOVE.run(&raw_request(&headers, query, None)))
}
