//! Per-route handlers.

pub mod activity;
pub mod assets;
pub mod keys;
