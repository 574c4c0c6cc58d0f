//! Proxy configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_TARGET_API: &str = "https://api.pyramidsfreight.com/api";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Upstream API base URL without a trailing slash.
    pub target_api: String,
    pub port: u16,
    /// Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
    /// Per-request upstream timeout. `None` leaves it to the runtime.
    pub upstream_timeout: Option<Duration>,
    /// Directory holding the built dashboard, served at `/`.
    pub static_dir: Option<String>,
}

impl ProxyConfig {
    /// Build typed proxy config from environment variables.
    ///
    /// Optional:
    /// - `TARGET_API`: upstream base URL (default [`DEFAULT_TARGET_API`])
    /// - `PORT`: listen port (default 3000)
    /// - `APP_ENV`: `production` enables secure cookies
    /// - `COOKIE_SECURE`: explicit boolean override for secure cookies
    /// - `UPSTREAM_TIMEOUT_SECS`: upstream request timeout
    /// - `STATIC_DIR`: dashboard bundle directory
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let target_api = lookup("TARGET_API")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_API.to_owned())
            .trim()
            .trim_end_matches('/')
            .to_owned();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        let production = lookup("APP_ENV").is_some_and(|v| v.trim().eq_ignore_ascii_case("production"));
        let cookie_secure = lookup("COOKIE_SECURE")
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or(production);

        let upstream_timeout = match lookup("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::Invalid { var: "UPSTREAM_TIMEOUT_SECS", value: raw })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        let static_dir = lookup("STATIC_DIR").filter(|v| !v.trim().is_empty());

        Ok(Self { target_api, port, cookie_secure, upstream_timeout, static_dir })
    }

    /// Config pointing at `target_api` with every other knob at its default.
    #[cfg(test)]
    #[must_use]
    pub fn with_target(target_api: &str) -> Self {
        Self {
            target_api: target_api.trim_end_matches('/').to_owned(),
            port: DEFAULT_PORT,
            cookie_secure: false,
            upstream_timeout: None,
            static_dir: None,
        }
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
