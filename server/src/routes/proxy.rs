//! Proxy route: relays `/api/proxy/{*path}` to the remote API.
//!
//! Besides forwarding, this layer owns the session cookie: it is issued when
//! an `admin/login` POST succeeds upstream and cleared on `admin/logout`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use uuid::Uuid;

use crate::services::relay::{self, Credential, LOGIN_ENDPOINT, LOGOUT_ENDPOINT, RelayError, RelayRequest, Relayed};
use crate::state::AppState;

/// Lifetime of the session cookie.
pub const SESSION_MAX_AGE: Duration = Duration::days(7);

pub(crate) fn relay_error_to_status(err: &RelayError) -> StatusCode {
    match err {
        RelayError::MalformedPath(_) => StatusCode::INTERNAL_SERVER_ERROR,
        RelayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        RelayError::Upstream(_) | RelayError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((relay::TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(SESSION_MAX_AGE)
        .build()
}

pub(crate) fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((relay::TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

/// Cookie changes implied by a relayed call.
pub(crate) fn session_cookie_delta(method: &Method, sub_path: &str, relayed: &Relayed, secure: bool) -> CookieJar {
    let jar = CookieJar::new();
    if *method != Method::POST {
        return jar;
    }

    if sub_path == LOGIN_ENDPOINT && relayed.status.is_success() {
        return match relayed.body.login_token() {
            Some(token) => {
                tracing::info!("login succeeded; issuing session cookie");
                jar.add(session_cookie(token.to_owned(), secure))
            }
            None => {
                tracing::warn!(status = relayed.status.as_u16(), "login response carries no token; no cookie issued");
                jar
            }
        };
    }

    if sub_path == LOGOUT_ENDPOINT {
        return jar.add(cleared_session_cookie(secure));
    }

    jar
}

/// `GET|POST|PUT|PATCH|DELETE /api/proxy/{*path}` — forward to `TARGET_API`.
pub async fn relay(State(state): State<AppState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    match relay_inner(&state, request_id, method, &uri, &headers, &body).await {
        Ok(response) => response,
        Err(e) => {
            let status = relay_error_to_status(&e);
            if status.is_server_error() {
                tracing::error!(%request_id, error = %e, "proxy request failed");
            } else {
                tracing::warn!(%request_id, error = %e, "proxy request rejected");
            }
            (status, Json(serde_json::json!({ "message": e.to_string() }))).into_response()
        }
    }
}

async fn relay_inner(
    state: &AppState,
    request_id: Uuid,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, RelayError> {
    let sub_path = relay::sub_path(uri.path())?;
    let url = relay::upstream_url(&state.config.target_api, sub_path, uri.query());
    let outbound = relay::outbound_body(&method, body)?;
    let credential = Credential::from_headers(headers);

    tracing::info!(
        %request_id,
        %method,
        path = sub_path,
        bearer = matches!(credential, Credential::Bearer(_)),
        "proxying request"
    );

    let relayed = relay::forward(
        &state.http,
        RelayRequest { method: method.clone(), url, credential, body: outbound },
    )
    .await?;

    tracing::info!(%request_id, status = relayed.status.as_u16(), "upstream responded");

    let jar = session_cookie_delta(&method, sub_path, &relayed, state.config.cookie_secure);
    Ok((relayed.status, jar, Json(relayed.body.into_json())).into_response())
}

#[cfg(test)]
#[path = "proxy_test.rs"]
mod tests;
