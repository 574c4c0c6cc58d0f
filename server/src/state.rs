//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the parsed proxy config and one pooled upstream HTTP client so
//! every relayed call reuses connections to the remote API.

use std::sync::Arc;

use crate::config::ProxyConfig;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; the config is Arc-wrapped and `reqwest::Client`
/// is already a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state and the upstream client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(concat!("dashboard-proxy/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { config: Arc::new(config), http })
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
