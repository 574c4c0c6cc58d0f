//! Client session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `auth` owns the login/logout flows and the current-user view; `user_cache`
//! is its freshness-tracked store for the fetched user.

pub mod auth;
pub mod user_cache;
