//! Inventory Guard library.
//!
//! Optimistic-concurrency inventory updates and a circuit-breaking,
//! retrying vendor client, served over HTTP.

// Core
pub mod inventory;
pub mod ledger;
pub mod vendor;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

// Surface
pub mod http;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
