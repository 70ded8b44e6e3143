//! Throwaway stand-ins for the execution and data-transfer services.
//!
//! Each fake echoes back what it received so tests can assert on the exact
//! framing the clients put on the wire.

#![allow(dead_code)]

use std::collections::HashMap;

use axum::extract::{Multipart, Query};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Bytes served by the fake data-transfer service for a valid pull.
pub const ARCHIVE_FIXTURE: &[u8] = &[0x50, 0x4b, 0x03, 0x04, 0x14, 0x00, 0xff, 0xfe, 0x00];

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve test router");
    });
    format!("http://{addr}")
}

/// A local URL nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);
    format!("http://{addr}")
}

fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// Execution service
// ---------------------------------------------------------------------------

pub fn execution_router() -> Router {
    Router::new()
        .route("/api/v1/cmd/", post(execution_handler))
        .route("/garbage/", post(|| async { "this is not json" }))
}

async fn execution_handler(headers: HeaderMap, body: String) -> (StatusCode, Json<Value>) {
    let content_type = header_text(&headers, CONTENT_TYPE.as_str());
    let Ok(envelope) = serde_json::from_str::<Value>(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": false, "message": "body is not JSON"})),
        );
    };
    let payload = &envelope["payload"];

    match payload["action"].as_str() {
        Some("run") => (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "jid": payload["meta"]["jid"],
                "received": payload,
                "content_type": content_type,
            })),
        ),
        Some("status") => (
            StatusCode::OK,
            Json(json!({
                "status": true,
                "jid": payload["meta"]["value"],
                "d_ret": {"l_status": ["finishedSuccessfully"]},
                "content_type": content_type,
            })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": false, "message": "unknown action"})),
        ),
    }
}

// ---------------------------------------------------------------------------
// Data-transfer service
// ---------------------------------------------------------------------------

pub fn data_router() -> Router {
    Router::new().route("/api/v1/", get(pull_handler).post(push_handler))
}

async fn push_handler(headers: HeaderMap, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    let mut d_msg = Value::Null;
    let mut filename = Value::Null;
    let mut part_filename = Value::Null;
    let mut size = 0usize;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "d_msg" => {
                let text = field.text().await.unwrap_or_default();
                d_msg = serde_json::from_str(&text).unwrap_or(Value::Null);
            }
            "filename" => {
                filename = Value::String(field.text().await.unwrap_or_default());
            }
            "local" => {
                part_filename = field
                    .file_name()
                    .map(|f| Value::String(f.to_string()))
                    .unwrap_or(Value::Null);
                size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
            }
            _ => {}
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": true,
            "mode": header_text(&headers, "mode"),
            "d_msg": d_msg,
            "filename": filename,
            "part_filename": part_filename,
            "size": size,
        })),
    )
}

/// Job key from a pull `meta` literal, if it has the shape the real service
/// accepts: a Python dict literal, not JSON.
fn pulled_job_key(meta: &str) -> Option<&str> {
    let well_formed = meta.contains("'local': {'path': ")
        && meta.contains("'createDir': True")
        && meta.contains("'specialHandling': {'op': 'plugin', 'cleanup': True}")
        && meta.contains("'compress': {'archive': 'zip', 'unpack': True, 'cleanup': True}");
    if !well_formed {
        return None;
    }
    let rest = meta.strip_prefix("{'remote': {'key': '")?;
    rest.split('\'').next()
}

async fn pull_handler(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Vec<u8>) {
    let action = params.get("action").map(String::as_str);
    let key = params.get("meta").and_then(|m| pulled_job_key(m));

    match (action, key) {
        (Some("pullPath"), Some("job42")) => (StatusCode::OK, ARCHIVE_FIXTURE.to_vec()),
        (Some("pullPath"), Some(_)) => (StatusCode::NOT_FOUND, b"no such job".to_vec()),
        _ => (StatusCode::BAD_REQUEST, b"malformed pull query".to_vec()),
    }
}
