//! Upstream relay: credential translation, URL building, body decoding.
//!
//! ARCHITECTURE
//! ============
//! The dashboard never talks to the remote API directly. Every call goes
//! through `/api/proxy/{*path}`, where the httpOnly `token` cookie is turned
//! into an `Authorization: Bearer` header and the request is forwarded 1:1.
//! The relay never invents response bodies for upstream answers: status and
//! payload come back as the upstream produced them.
//!
//! TRADE-OFFS
//! ==========
//! Non-JSON upstream bodies are relayed as a JSON string so callers can always
//! parse the proxy response as JSON, at the cost of byte-for-byte fidelity for
//! text payloads.

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde_json::Value;

/// Route prefix the relay is mounted under.
pub const PROXY_PREFIX: &str = "/api/proxy/";
/// Name of the httpOnly session cookie.
pub const TOKEN_COOKIE: &str = "token";
/// Upstream sub-path whose successful POST issues the session cookie.
pub const LOGIN_ENDPOINT: &str = "admin/login";
/// Upstream sub-path whose POST clears the session cookie.
pub const LOGOUT_ENDPOINT: &str = "admin/logout";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("path is not under {PROXY_PREFIX}: {0}")]
    MalformedPath(String),
    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),
    #[error("upstream request failed: {0}")]
    Upstream(String),
    #[error("upstream body unreadable: {0}")]
    UpstreamBody(String),
}

/// Extract the `token` cookie value, percent-decoded exactly once.
///
/// Only a cookie pair named exactly `token` matches; `xtoken=` or
/// `token_type=` are ignored. Values that fail to decode (invalid UTF-8
/// escapes) are used raw.
#[must_use]
pub fn token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| name.trim() == TOKEN_COOKIE && !value.trim().is_empty())
        .map(|(_, value)| {
            let value = value.trim();
            urlencoding::decode(value).map_or_else(|_| value.to_owned(), std::borrow::Cow::into_owned)
        })
}

/// The part of an inbound request path after [`PROXY_PREFIX`].
pub fn sub_path(path: &str) -> Result<&str, RelayError> {
    path.strip_prefix(PROXY_PREFIX)
        .ok_or_else(|| RelayError::MalformedPath(path.to_owned()))
}

/// Build `{base}/{segments...}[?query]`.
///
/// Segments are kept in order, empty ones included, so the upstream sees the
/// same shape the caller sent.
#[must_use]
pub fn upstream_url(base: &str, sub_path: &str, query: Option<&str>) -> String {
    let segments: Vec<&str> = sub_path.split('/').collect();
    let mut url = format!("{}/{}", base.trim_end_matches('/'), segments.join("/"));
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Decide what JSON body, if any, goes upstream for `method`.
///
/// POST/PUT/PATCH must carry JSON. DELETE forwards a body only when one parses.
pub fn outbound_body(method: &Method, raw: &[u8]) -> Result<Option<Value>, RelayError> {
    if *method == Method::POST || *method == Method::PUT || *method == Method::PATCH {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(RelayError::InvalidBody("missing body".into()));
        }
        return serde_json::from_slice(raw)
            .map(Some)
            .map_err(|e| RelayError::InvalidBody(e.to_string()));
    }
    if *method == Method::DELETE {
        return Ok(serde_json::from_slice(raw).ok());
    }
    Ok(None)
}

/// Token carried by a login response, if it honors the login contract.
#[must_use]
pub fn login_token(body: &Value) -> Option<&str> {
    body.get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
}

// =============================================================================
// FORWARDING
// =============================================================================

/// Credential attached to the outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    /// Token taken from the session cookie.
    Bearer(String),
    /// Caller-supplied `Authorization` header, passed through untouched.
    Passthrough(HeaderValue),
    None,
}

impl Credential {
    /// Cookie token wins; otherwise fall back to the inbound header.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        if let Some(token) = token_from_cookies(headers) {
            return Self::Bearer(token);
        }
        headers
            .get(AUTHORIZATION)
            .cloned()
            .map_or(Self::None, Self::Passthrough)
    }
}

#[derive(Debug)]
pub struct RelayRequest {
    pub method: Method,
    pub url: String,
    pub credential: Credential,
    pub body: Option<Value>,
}

/// Upstream payload, decoded by content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayBody {
    Json(Value),
    Text(String),
}

impl RelayBody {
    /// Decode a raw upstream body. Empty JSON bodies become `null`.
    pub fn decode(is_json: bool, text: String) -> Result<Self, RelayError> {
        if !is_json {
            return Ok(Self::Text(text));
        }
        if text.trim().is_empty() {
            return Ok(Self::Json(Value::Null));
        }
        serde_json::from_str(&text)
            .map(Self::Json)
            .map_err(|e| RelayError::UpstreamBody(e.to_string()))
    }

    #[must_use]
    pub fn login_token(&self) -> Option<&str> {
        match self {
            Self::Json(value) => login_token(value),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

#[derive(Debug)]
pub struct Relayed {
    pub status: StatusCode,
    pub body: RelayBody,
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}

/// Perform a single forward attempt. No retries.
pub async fn forward(http: &reqwest::Client, req: RelayRequest) -> Result<Relayed, RelayError> {
    let mut builder = http.request(req.method, &req.url);
    builder = match req.credential {
        Credential::Bearer(token) => builder.bearer_auth(token),
        Credential::Passthrough(value) => builder.header(AUTHORIZATION, value),
        Credential::None => builder,
    };
    if let Some(body) = &req.body {
        builder = builder.json(body);
    }

    let resp = builder
        .send()
        .await
        .map_err(|e| RelayError::Upstream(e.to_string()))?;

    let status = resp.status();
    let is_json = is_json_content_type(resp.headers());
    let text = resp
        .text()
        .await
        .map_err(|e| RelayError::UpstreamBody(e.to_string()))?;

    Ok(Relayed { status, body: RelayBody::decode(is_json, text)? })
}

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;
