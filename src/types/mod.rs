//! Core types for the access-control server.
//!
//! - **Key**: validated fixed-length access code
//! - **Errors**: application error types with thiserror derives
//! - **Config**: server, device, asset and observability settings

mod config;
mod errors;
mod key;

pub use config::{
    AssetsConfig, Config, DeviceConfig, ObservabilityConfig, ServerConfig, DEFAULT_BACKLOG,
    DEFAULT_MAX_CONNECTIONS,
};
pub use errors::{Error, Result};
pub use key::{Key, KEY_SIZE};
