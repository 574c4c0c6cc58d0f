//! Wire DTOs for the remote admin API.
//!
//! DESIGN
//! ======
//! The remote API is loosely shaped: user records arrive at the root, under
//! `data`, or under `admin`, and ids may be numbers or strings. These types
//! accept those variants and keep unknown fields so nothing is lost when a
//! record is cached and handed back to a page.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// =============================================================================
// AUTH
// =============================================================================

/// Login form payload sent to `admin/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember: Option<bool>,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into(), remember: None }
    }
}

/// Token carried by a login response, if it honors the login contract
/// (a non-empty string under `token`).
#[must_use]
pub fn login_token(body: &Value) -> Option<String> {
    body.get("token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

/// Remote record identifier; the API uses both numeric and string ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

/// The authenticated admin as returned by `admin/check-auth`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Any other fields the API sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthUser {
    /// Pull a user out of a check-auth payload.
    ///
    /// Looks under `data`, then `admin`, then at the root. A candidate only
    /// counts when it is an object with a non-null `id`.
    #[must_use]
    pub fn from_payload(body: &Value) -> Option<Self> {
        [body.get("data"), body.get("admin"), Some(body)]
            .into_iter()
            .flatten()
            .filter(|candidate| candidate.get("id").is_some_and(|id| !id.is_null()))
            .find_map(|candidate| serde_json::from_value(candidate.clone()).ok())
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Common response wrapper: `{ result, data, message }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub result: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// `data` is present and `result`, when given, reads `Success`.
    pub fn succeeded(&self) -> bool {
        self.data.is_some()
            && self
                .result
                .as_deref()
                .map_or(true, |r| r.eq_ignore_ascii_case("success"))
    }

    /// The payload when the call succeeded.
    pub fn into_data(self) -> Option<T> {
        if self.succeeded() { self.data } else { None }
    }
}

// =============================================================================
// ADVERTISEMENT APPROVAL
// =============================================================================

/// Body for `posts/{id}/ad-status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdApprovalRequest {
    pub is_ad_approved: bool,
    /// `1` when approved, `0` when rejected.
    pub status: u8,
    /// RFC 3339 approval time; `null` on rejection.
    pub ad_approved_at: Option<String>,
}

impl AdApprovalRequest {
    #[must_use]
    pub fn new(approved: bool, at: OffsetDateTime) -> Self {
        Self {
            is_ad_approved: approved,
            status: u8::from(approved),
            ad_approved_at: if approved { at.format(&Rfc3339).ok() } else { None },
        }
    }
}

/// Whether an ad-status response reports the change as applied.
#[must_use]
pub fn ad_status_accepted(body: &Value) -> bool {
    let status_ok = body
        .get("status")
        .and_then(Value::as_i64)
        .is_some_and(|s| s == 200 || s == 1);
    let has = |key: &str| body.get(key).is_some_and(|v| !v.is_null());
    status_ok || has("post") || has("message")
}

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub month: String,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySeries {
    #[serde(default)]
    pub data: Vec<MonthCount>,
    #[serde(default)]
    pub total: u64,
}

impl MonthlySeries {
    /// The trailing `months` entries, oldest first.
    #[must_use]
    pub fn last_months(&self, months: usize) -> &[MonthCount] {
        &self.data[self.data.len().saturating_sub(months)..]
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    #[serde(default)]
    pub active_users: u64,
    #[serde(default)]
    pub pending_users: u64,
    #[serde(default)]
    pub jobs: u64,
    #[serde(default)]
    pub rents: u64,
    #[serde(default)]
    pub sales: u64,
    #[serde(default)]
    pub products: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    #[serde(default)]
    pub users_active: MonthlySeries,
    #[serde(default)]
    pub users_pending: MonthlySeries,
    #[serde(default)]
    pub jobs: MonthlySeries,
    #[serde(default)]
    pub rents: MonthlySeries,
    #[serde(default)]
    pub sales: MonthlySeries,
    #[serde(default)]
    pub products: MonthlySeries,
}

/// Payload of `GET reports`, feeding the dashboard charts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub totals: ReportTotals,
    #[serde(default)]
    pub monthly: MonthlyReport,
}

impl ReportData {
    /// Month labels available for the range selector.
    #[must_use]
    pub fn months(&self) -> Vec<&str> {
        self.monthly
            .users_active
            .data
            .iter()
            .map(|m| m.month.as_str())
            .collect()
    }
}
