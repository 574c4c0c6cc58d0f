//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate environment concerns (token persistence) from the
//! session logic to improve reuse and testability.

pub mod storage;
