use super::*;
use crate::test_support::{self, GOOD_EMAIL, TOKEN};
use serde_json::json;

// =============================================================================
// pure helpers
// =============================================================================

#[test]
fn endpoint_joins_without_double_slash() {
    let api = ApiClient::new("http://localhost:3000/api/proxy/").expect("client");
    assert_eq!(api.base(), "http://localhost:3000/api/proxy");
    assert_eq!(api.endpoint("posts"), "http://localhost:3000/api/proxy/posts");
    assert_eq!(api.endpoint("/show-post/3"), "http://localhost:3000/api/proxy/show-post/3");
}

#[test]
fn relative_base_is_rejected() {
    assert!(matches!(ApiClient::new("/api/proxy"), Err(ApiError::InvalidBaseUrl(_))));
}

#[test]
fn parse_body_variants() {
    assert_eq!(parse_body(""), Value::Null);
    assert_eq!(parse_body("  \n"), Value::Null);
    assert_eq!(parse_body(r#"{"a":1}"#), json!({"a": 1}));
    assert_eq!(parse_body("maintenance"), json!("maintenance"));
}

#[test]
fn request_builder_accumulates() {
    let req = ApiRequest::post("admin/login")
        .query("page", "2")
        .json(json!({"email": "x"}))
        .bearer("abc");
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.query, vec![("page".to_owned(), "2".to_owned())]);
    assert_eq!(req.body, Some(json!({"email": "x"})));
    assert_eq!(req.bearer.as_deref(), Some("abc"));
}

#[test]
fn error_exposes_status_and_message() {
    let err = ApiError::Status { status: 401, body: json!({"message": "Unauthenticated."}) };
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.message(), Some("Unauthenticated."));
    assert_eq!(ApiError::Request("refused".into()).status(), None);
}

// =============================================================================
// send
// =============================================================================

#[tokio::test]
async fn send_forwards_query_body_and_bearer() {
    let proxy = test_support::spawn_proxy().await;
    let api = proxy.client();

    let body = api
        .send(ApiRequest::put("posts").query("page", "3").json(json!({"x": 1})).bearer("abc"))
        .await
        .expect("echo");
    assert_eq!(body["method"], "PUT");
    assert_eq!(body["query"], "page=3");

    let call = proxy.last_call("posts");
    assert_eq!(call.authorization.as_deref(), Some("Bearer abc"));
    assert_eq!(call.body, Some(json!({"x": 1})));
}

#[tokio::test]
async fn non_success_status_becomes_status_error() {
    let proxy = test_support::spawn_proxy().await;
    let err = proxy
        .client()
        .send(ApiRequest::get("admin/check-auth"))
        .await
        .expect_err("unauthenticated");
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.message(), Some("Unauthenticated."));
}

#[tokio::test]
async fn text_error_body_is_kept_as_string() {
    let proxy = test_support::spawn_proxy().await;
    let err = proxy.client().send(ApiRequest::get("plain-error")).await.expect_err("502");
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, json!("upstream down"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_success_body_is_null() {
    let proxy = test_support::spawn_proxy().await;
    let body = proxy.client().send(ApiRequest::get("empty")).await.expect("204");
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn transport_failure_is_request_error() {
    let api = ApiClient::new(&test_support::unreachable_base().await).expect("client");
    let err = api.send(ApiRequest::get("posts")).await.expect_err("refused");
    assert!(matches!(err, ApiError::Request(_)));
}

#[tokio::test]
async fn send_as_reports_shape_mismatch() {
    let proxy = test_support::spawn_proxy().await;
    let err = proxy
        .client()
        .send_as::<Vec<u8>>(ApiRequest::get("posts"))
        .await
        .expect_err("object is not a list");
    assert!(matches!(err, ApiError::Parse(_)));
}

// =============================================================================
// cookie jar
// =============================================================================

#[tokio::test]
async fn login_cookie_rides_along_until_forgotten() {
    let proxy = test_support::spawn_proxy().await;
    let api = proxy.client();
    assert!(!api.has_session_cookie());

    api.send(ApiRequest::post("admin/login").json(json!({"email": GOOD_EMAIL, "password": "x"})))
        .await
        .expect("login");
    assert!(api.has_session_cookie());

    // No bearer: the cookie alone authenticates.
    let user = api.send(ApiRequest::get("admin/check-auth")).await.expect("cookie session");
    assert_eq!(user["data"]["id"], 1);
    let cookie = proxy.last_call("admin/check-auth").cookie.expect("cookie sent");
    assert!(cookie.contains(&format!("token={TOKEN}")));

    api.forget_session_cookie();
    assert!(!api.has_session_cookie());
    let err = api.send(ApiRequest::get("admin/check-auth")).await.expect_err("no session");
    assert_eq!(err.status(), Some(401));
}
