//! Typed dashboard calls: entity lists and details, ad approval, reports.
//!
//! These are thin wrappers over [`ApiClient::send`]; authentication rides on
//! the proxy's session cookie held in the client's jar.

#[cfg(test)]
#[path = "resources_test.rs"]
mod resources_test;

use serde_json::Value;
use time::OffsetDateTime;
use urlencoding::encode;

use super::api::{ApiClient, ApiError, ApiRequest};
use super::types::{AdApprovalRequest, Envelope, ReportData, ad_status_accepted};

/// Record kinds the dashboard browses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    Post,
    Job,
    Product,
    Rent,
    User,
}

impl Entity {
    pub const ALL: [Self; 5] = [Self::Post, Self::Job, Self::Product, Self::Rent, Self::User];

    /// Collection endpoint; the API names lists after the singular resource.
    pub fn list_path(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Job => "job",
            Self::Product => "product",
            Self::Rent => "rent",
            Self::User => "user",
        }
    }

    /// Detail endpoint for `id`. Posts use the legacy `show-post` route.
    pub fn detail_path(self, id: &str) -> String {
        let id = encode(id);
        match self {
            Self::Post => format!("show-post/{id}"),
            other => format!("{}/{id}", other.list_path()),
        }
    }
}

/// Product moderation state, sent as the `active` list filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductStatus {
    Active,
    /// Awaiting approval.
    Pending,
}

impl ProductStatus {
    pub fn active_flag(self) -> &'static str {
        match self {
            Self::Active => "1",
            Self::Pending => "0",
        }
    }
}

fn list_request(entity: Entity, query: &[(&str, &str)]) -> ApiRequest {
    query
        .iter()
        .fold(ApiRequest::get(entity.list_path()), |req, (k, v)| req.query(*k, *v))
}

/// `GET {collection}` with `query` pairs, returning the raw body.
///
/// # Errors
///
/// Propagates [`ApiError`] from the underlying call.
pub async fn list(api: &ApiClient, entity: Entity, query: &[(&str, &str)]) -> Result<Value, ApiError> {
    api.send(list_request(entity, query)).await
}

/// Product list narrowed to `status`; `query` adds paging and other filters.
///
/// # Errors
///
/// Propagates [`ApiError`] from the underlying call.
pub async fn products(api: &ApiClient, status: ProductStatus, query: &[(&str, &str)]) -> Result<Value, ApiError> {
    let req = list_request(Entity::Product, query).query("active", status.active_flag());
    api.send(req).await
}

/// `GET` the detail endpoint for `id`.
///
/// # Errors
///
/// Propagates [`ApiError`]; a body that is not an envelope is
/// [`ApiError::Parse`].
pub async fn detail(api: &ApiClient, entity: Entity, id: &str) -> Result<Envelope<Value>, ApiError> {
    api.send_as(ApiRequest::get(entity.detail_path(id))).await
}

/// Approve or reject the advertisement on post `post_id`.
///
/// Returns whether the API reported the change as applied.
///
/// # Errors
///
/// Propagates [`ApiError`] from the underlying call.
pub async fn set_ad_approval(api: &ApiClient, post_id: &str, approved: bool) -> Result<bool, ApiError> {
    let payload = AdApprovalRequest::new(approved, OffsetDateTime::now_utc());
    let body = serde_json::to_value(&payload).map_err(|e| ApiError::Parse(e.to_string()))?;
    let resp = api
        .send(ApiRequest::post(format!("posts/{}/ad-status", encode(post_id))).json(body))
        .await?;
    let accepted = ad_status_accepted(&resp);
    if !accepted {
        tracing::warn!(post_id, approved, "ad-status change not acknowledged");
    }
    Ok(accepted)
}

/// `GET reports`.
///
/// # Errors
///
/// Propagates [`ApiError`] from the underlying call.
pub async fn reports(api: &ApiClient) -> Result<ReportData, ApiError> {
    api.send_as(ApiRequest::get("reports")).await
}
