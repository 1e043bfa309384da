//! # Keygate - Keypad Access-Control Server
//!
//! A keypad/alarm peripheral submits codes; the server checks them against an
//! admin-managed allow-list, pulses LEDs and a buzzer with the verdict, and
//! records each attempt in an audit log. A small HTTP interface lets the admin
//! console list and edit the allow-list and read the log.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────────────────────────┐
//!  keypad ──────▶ │ DecisionLoop (one background task)        │
//!                 │   read → contains? → actuators → append   │
//!                 └──────┬─────────────────┬─────────────┬────┘
//!                        │                 │             │
//!                 ┌──────▼─────┐   ┌───────▼─────┐  ┌────▼──────────┐
//!                 │  KeyStore  │   │ ActivityLog │  │ DeviceGateway │
//!                 │ (own lock) │   │ (own lock)  │  │ (write lock)  │
//!                 └──────▲─────┘   └───────▲─────┘  └────▲──────────┘
//!                        │                 │             │
//!                 ┌──────┴─────────────────┴─────────────┴────┐
//!  browser ─────▶ │ AccessServer: ≤ max_connections workers,  │
//!                 │ one request per connection                │
//!                 └───────────────────────────────────────────┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod device;
pub mod engine;
pub mod http;
pub mod state;
pub mod store;
pub mod types;

// Internal utilities
pub mod observability;

pub use state::AppState;
pub use types::{Config, Error, Key, Result};
