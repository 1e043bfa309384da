//! Admin console transport.
//!
//! A hand-matched HTTP/1.x interface: one request per connection, routed by
//! method and path, answered with `200 OK` and closed. Concurrency is bounded
//! by the admission control in [`server`].

pub mod codec;
pub mod handlers;
pub mod router;
pub mod server;

pub use handlers::assets::StaticAssets;
pub use router::{Context, Route};
pub use server::{AccessServer, Admission};
