#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Drive one request through a fresh router. Pipelines, registries, and the
/// store are process-wide, so state persists across calls within one test
/// binary.
pub async fn send(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let app = parley_api::handlers::app();

    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.oneshot(request).await.context("router call failed")?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let value = serde_json::from_slice(&bytes).context("response was not JSON")?;
    Ok((status, value))
}

pub struct Session {
    pub token: String,
    pub user_id: i64,
}

/// Log a host in (registering on first use) and return their credential.
pub async fn login_host(name: &str) -> Result<Session> {
    let (status, envelope) = send(
        "POST",
        "/auth/host",
        None,
        Some(json!({"name": name, "password": "integration-pw"})),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "host login failed: {envelope}");
    session_from(&envelope)
}

/// Log a guest in under the given host and return their credential.
pub async fn login_guest(name: &str, host_id: i64) -> Result<Session> {
    let (status, envelope) = send(
        "POST",
        "/auth/guest",
        None,
        Some(json!({"name": name, "password": "", "host_id": host_id})),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "guest login failed: {envelope}");
    session_from(&envelope)
}

fn session_from(envelope: &Value) -> Result<Session> {
    let body = &envelope["body"];
    Ok(Session {
        token: body["auth"]
            .as_str()
            .context("login body carried no credential")?
            .to_string(),
        user_id: body["data"]["user_id"]
            .as_i64()
            .context("login payload carried no user id")?,
    })
}

/// Create a group chat for the host with the given guest ids; returns the
/// success envelope body.
pub async fn create_group_chat(host: &Session, guest_ids: &[i64]) -> Result<Value> {
    let (status, envelope) = send(
        "POST",
        "/chat/group",
        Some(&host.token),
        Some(json!({"guests": guest_ids})),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "group chat creation failed: {envelope}");
    Ok(envelope["body"].clone())
}
