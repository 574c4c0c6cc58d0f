//! Fetch helper for calls through the same-origin proxy.
//!
//! Every dashboard request goes through [`ApiClient::send`]. The client keeps
//! a cookie jar so the httpOnly `token` cookie issued by the proxy on login
//! rides along on later calls, the way a browser would send it.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures and non-success statuses come back as [`ApiError`];
//! callers such as the auth session decide whether to surface or swallow them.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Name of the session cookie the proxy issues.
pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (connect, TLS, timeout, read).
    #[error("API request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status.
    #[error("API response error: status {status}")]
    Status { status: u16, body: Value },

    #[error("API response parse failed: {0}")]
    Parse(String),
}

impl ApiError {
    /// HTTP status, when the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The API's own `message` field, suitable for a toast.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => body.get("message").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// One call through the proxy.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, bearer: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach `Authorization: Bearer <token>` explicitly.
    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Parse a response body: empty → `null`, JSON → value, anything else → string.
pub(crate) fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

/// HTTP client bound to the proxy base URL (e.g. `https://admin.example/api/proxy`).
#[derive(Clone, Debug)]
pub struct ApiClient {
    base: String,
    origin: Url,
    http: reqwest::Client,
    jar: Arc<Jar>,
}

impl ApiClient {
    /// Build a client for `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not an absolute URL or the HTTP client
    /// cannot be constructed.
    pub fn new(base: &str) -> Result<Self, ApiError> {
        let base = base.trim().trim_end_matches('/').to_owned();
        let origin = Url::parse(&base).map_err(|e| ApiError::InvalidBaseUrl(format!("{base}: {e}")))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { base, origin, http, jar })
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Full URL for `path`, tolerating a leading `/`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Send `req` and return the parsed body of a successful response.
    ///
    /// # Errors
    ///
    /// [`ApiError::Request`] on transport failure, [`ApiError::Status`] on a
    /// non-success status.
    pub async fn send(&self, req: ApiRequest) -> Result<Value, ApiError> {
        let url = self.endpoint(&req.path);
        let mut builder = self.http.request(req.method.clone(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let body = parse_body(&text);

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), method = %req.method, path = %req.path, "api call rejected");
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        Ok(body)
    }

    /// Send `req` and deserialize the body into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::send`], plus [`ApiError::Parse`] when the body
    /// does not match `T`.
    pub async fn send_as<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ApiError> {
        let body = self.send(req).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Whether the jar currently holds the proxy's session cookie.
    pub fn has_session_cookie(&self) -> bool {
        self.jar
            .cookies(&self.origin)
            .and_then(|header| header.to_str().map(str::to_owned).ok())
            .is_some_and(|cookies| {
                cookies
                    .split(';')
                    .filter_map(|pair| pair.trim().split_once('='))
                    .any(|(name, value)| name == SESSION_COOKIE && !value.is_empty())
            })
    }

    /// Drop the session cookie from the jar.
    pub fn forget_session_cookie(&self) {
        self.jar
            .add_cookie_str(&format!("{SESSION_COOKIE}=; Max-Age=0; Path=/"), &self.origin);
    }
}
