//! Client-side data access and session state for the admin dashboard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything here talks to the remote API through the same-origin proxy
//! (`/api/proxy`). `net` holds the fetch helper and typed dashboard calls,
//! `state` owns the auth session, and `util` the token persistence backends.

pub mod net;
pub mod state;
pub mod util;

#[cfg(test)]
mod test_support;

pub use net::api::{ApiClient, ApiError, ApiRequest};
pub use net::types::{AuthUser, Credentials};
pub use state::auth::{AuthOptions, AuthPhase, AuthSession, AuthSnapshot, CredentialMode, Navigator};
pub use util::storage::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
