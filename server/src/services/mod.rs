//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the upstream-facing logic so route handlers can stay
//! focused on protocol translation and cookie plumbing.

pub mod relay;
