// HTTP surface: thin axum shims that gather raw request material and run
// the endpoint's pipeline. All behavior lives in the pipelines themselves.

pub mod chat;
pub mod message;
pub mod user;

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::Envelope;
use crate::pipeline::RawRequest;

pub fn app() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(user_routes())
        .merge(chat_routes())
        .merge(message_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn user_routes() -> Router {
    Router::new()
        .route("/auth/host", post(user::host_login_post))
        .route("/auth/guest", post(user::guest_login_post))
        .route("/auth/heartbeat", get(user::heartbeat_get))
}

fn chat_routes() -> Router {
    use axum::routing::delete;

    Router::new()
        .route("/chat", get(chat::chat_list_get))
        .route(
            "/chat/group",
            post(chat::group_chat_post).delete(chat::group_chat_delete),
        )
        .route("/chat/group/name", post(chat::group_chat_name_post))
        .route("/chat/guest", delete(chat::group_chat_guest_delete).put(chat::group_chat_guest_put))
}

fn message_routes() -> Router {
    Router::new().route(
        "/message",
        get(message::message_get)
            .post(message::message_post)
            .delete(message::message_delete),
    )
}

/// Assemble pipeline input from the axum extractors every shim shares.
pub(crate) fn raw_request(
    headers: &HeaderMap,
    query: HashMap<String, String>,
    body: Option<Value>,
) -> RawRequest {
    RawRequest {
        token: headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(String::from),
        query: query
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
        body: body.unwrap_or(Value::Null),
    }
}

async fn root() -> Envelope {
    let version = env!("CARGO_PKG_VERSION");

    Envelope::ok(Some(json!({
        "name": "Parley API",
        "version": version,
        "description": "Multi-tenant chat backend",
        "endpoints": {
            "auth": "/auth/host, /auth/guest (public - token acquisition), /auth/heartbeat",
            "chat": "/chat, /chat/group, /chat/group/name, /chat/guest",
            "message": "/message",
        },
    })))
}

async fn health() -> Envelope {
    let now = chrono::Utc::now();
    Envelope::ok(Some(json!({
        "status": "ok",
        "timestamp": now,
    })))
}
