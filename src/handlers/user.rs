use std::collections::HashMap;

use axum::extract::Query;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::api::{respond, HandlerResult};
use crate::auth;
use crate::models::chat::Chat;
use crate::models::user::{self, User, GUEST_USER_PARAMS, HOST_USER_PARAMS};
use crate::pipeline::{rule, Pipeline, RequestContext};

use super::raw_request;

static HOST_LOGIN: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("host_login")
        .body(vec![
            rule(&HOST_USER_PARAMS.name),
            rule(&HOST_USER_PARAMS.password),
        ])
        .handle(host_login_handler)
});

fn host_login_handler(ctx: &RequestContext) -> HandlerResult {
    let name: String = ctx.value("name")?;
    let password: String = ctx.value("password")?;
    let host = user::host_login(&name, &password)?;
    Ok(Some(auth::login_token(&host)?))
}

static GUEST_LOGIN: Lazy<Pipeline> = Lazy::new(|| {
    Pipeline::named("guest_login")
        .body(vec![
            rule(&GUEST_USER_PARAMS.name),
            rule(&GUEST_USER_PARAMS.password),
            rule(&GUEST_USER_PARAMS.host_id),
        ])
        .handle(guest_login_handler)
});

fn guest_login_handler(ctx: &RequestContext) -> HandlerResult {
    let name: String = ctx.value("name")?;
    let password: Option<String> = ctx.value("password")?;
    let host: User = ctx.value("host")?;
    let guest = user::guest_login(&name, password.as_deref().unwrap_or(""), &host)?;

    // Every guest gets their single chat with the host up front
    Chat::single_get_or_create(&guest, &host);
    Ok(Some(auth::login_token(&guest)?))
}

static HEARTBEAT: Lazy<Pipeline> =
    Lazy::new(|| Pipeline::named("heartbeat").require_user().handle(heartbeat_handler));

fn heartbeat_handler(ctx: &RequestContext) -> HandlerResult {
    let mut user = ctx.require_principal()?.clone();
    user.heartbeat();
    Ok(None)
}

pub async fn host_login_post(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Response {
    respond(HOST_LOGIN.run(&raw_request(&headers, query, body.map(|Json(value)| value))))
}

pub async fn guest_login_post(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Response {
    respond(GUEST_LOGIN.run(&raw_request(&headers, query, body.map(|Json(value)| value))))
}

pub async fn heartbeat_get(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(HEARTBEAT.run(&raw_request(&headers, query, None)))
}
