//! Networking modules for the proxied REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` is the fetch helper every call goes through, `resources` wraps the
//! dashboard's entity/report endpoints, and `types` defines the wire schema.

pub mod api;
pub mod resources;
pub mod types;
