//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The dashboard is a thin client over a remote REST API. This router exposes
//! the same-origin relay at `/api/proxy/{*path}` plus a health check, and
//! optionally serves the built dashboard bundle at `/`.

pub mod proxy;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes: the relay and a health check.
fn api_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/proxy/{*path}",
            get(proxy::relay)
                .post(proxy::relay)
                .put(proxy::relay)
                .patch(proxy::relay)
                .delete(proxy::relay),
        )
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Full application router with request tracing.
pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let router = api_routes(state);
    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
