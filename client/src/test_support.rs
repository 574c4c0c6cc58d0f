//! Fake same-origin proxy for client tests.
//!
//! Mounted at `/api/proxy`, it answers the admin endpoints the session and
//! resource calls use, records every request, and lets a test slow down or
//! fail individual endpoints.

use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::net::api::ApiClient;

pub const GOOD_EMAIL: &str = "a@b.com";
pub const NO_TOKEN_EMAIL: &str = "notoken@b.com";
pub const TOKEN: &str = "tok1";

#[derive(Debug, Clone)]
pub struct SeenCall {
    pub method: String,
    /// Path below `/api/proxy/`.
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct Knobs {
    pub check_auth_delay_ms: AtomicU64,
    pub logout_delay_ms: AtomicU64,
    /// `0` means 200.
    pub logout_status: AtomicU16,
    /// Bumps the user's `name` suffix on every check-auth answer.
    pub check_auth_hits: AtomicU64,
}

#[derive(Clone, Default)]
struct Shared {
    seen: Arc<Mutex<Vec<SeenCall>>>,
    knobs: Arc<Knobs>,
}

pub struct FakeProxy {
    /// Proxy base, e.g. `http://127.0.0.1:1234/api/proxy`.
    pub base: String,
    shared: Shared,
}

impl FakeProxy {
    pub fn calls(&self) -> Vec<SeenCall> {
        self.shared.seen.lock().expect("seen mutex should lock").clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }

    pub fn last_call(&self, path: &str) -> SeenCall {
        self.calls()
            .into_iter()
            .rev()
            .find(|c| c.path == path)
            .unwrap_or_else(|| panic!("no call to {path}"))
    }

    pub fn knobs(&self) -> &Knobs {
        &self.shared.knobs
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base).expect("client should build")
    }
}

fn user_body(hit: u64) -> Value {
    json!({"data": {"id": 1, "name": format!("Admin {hit}"), "email": GOOD_EMAIL}})
}

fn has_session(call: &SeenCall) -> bool {
    let bearer = call.authorization.as_deref() == Some(format!("Bearer {TOKEN}").as_str());
    let cookie = call
        .cookie
        .as_deref()
        .is_some_and(|c| c.split(';').any(|p| p.trim() == format!("token={TOKEN}")));
    bearer || cookie
}

async fn handle(State(shared): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let header = |name| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let call = SeenCall {
        method: method.to_string(),
        path: uri.path().trim_start_matches("/api/proxy/").to_owned(),
        query: uri.query().map(str::to_owned),
        authorization: header(AUTHORIZATION),
        cookie: header(COOKIE),
        body: serde_json::from_slice(&body).ok(),
    };
    shared.seen.lock().expect("seen mutex should lock").push(call.clone());
    let knobs = &shared.knobs;

    match (method.as_str(), call.path.as_str()) {
        ("POST", "admin/login") => {
            let email = call.body.as_ref().and_then(|b| b.get("email")).and_then(Value::as_str);
            match email {
                Some(GOOD_EMAIL) => (
                    [(SET_COOKIE, format!("token={TOKEN}; Path=/; HttpOnly; SameSite=Lax"))],
                    Json(json!({"token": TOKEN, "admin": {"id": 1, "name": "Admin"}})),
                )
                    .into_response(),
                Some(NO_TOKEN_EMAIL) => Json(json!({"message": "welcome"})).into_response(),
                _ => (StatusCode::UNAUTHORIZED, Json(json!({"message": "Invalid credentials"}))).into_response(),
            }
        }
        ("GET", "admin/check-auth") => {
            let delay = knobs.check_auth_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if has_session(&call) {
                let hit = knobs.check_auth_hits.fetch_add(1, Ordering::SeqCst) + 1;
                Json(user_body(hit)).into_response()
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthenticated."}))).into_response()
            }
        }
        ("POST", "admin/logout") => {
            let delay = knobs.logout_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            let status = match knobs.logout_status.load(Ordering::SeqCst) {
                0 => StatusCode::OK,
                code => StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            };
            (
                status,
                [(SET_COOKIE, "token=; Path=/; HttpOnly; Max-Age=0".to_owned())],
                Json(json!({"message": "Logged out"})),
            )
                .into_response()
        }
        ("GET", "reports") => Json(json!({
            "totals": {"active_users": 12, "pending_users": 3, "jobs": 5, "rents": 2, "sales": 7, "products": 9},
            "monthly": {
                "users_active": {"data": [{"month": "Jan", "count": 4}, {"month": "Feb", "count": 8}], "total": 12},
                "jobs": {"data": [{"month": "Jan", "count": 2}, {"month": "Feb", "count": 3}], "total": 5}
            }
        }))
        .into_response(),
        ("GET", "show-post/404") => {
            (StatusCode::NOT_FOUND, Json(json!({"result": "Error", "message": "Post not found"}))).into_response()
        }
        ("GET", "show-post/7") => Json(json!({"result": "Success", "data": {"id": 7, "title": "Tractor"}})).into_response(),
        ("POST", "posts/9/ad-status") => Json(json!({"status": 0})).into_response(),
        ("POST", path) if path.starts_with("posts/") && path.ends_with("/ad-status") => {
            Json(json!({"status": 200, "post": {"id": 1}})).into_response()
        }
        ("GET", "plain-error") => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
        ("GET", "empty") => StatusCode::NO_CONTENT.into_response(),
        _ => Json(json!({
            "data": [],
            "method": call.method,
            "path": call.path,
            "query": call.query,
            "body": call.body,
        }))
        .into_response(),
    }
}

pub async fn spawn_proxy() -> FakeProxy {
    let shared = Shared::default();
    let app = Router::new().fallback(handle).with_state(shared.clone());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake proxy failed");
    });
    FakeProxy { base: format!("http://{addr}/api/proxy"), shared }
}

/// A proxy base nothing listens on.
pub async fn unreachable_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/api/proxy")
}
