//! HTTP surface of the service.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, per-request span)
//!     → handlers.rs (items → inventory service, prices → vendor client)
//!     → mock.rs (simulated vendor, when enabled)
//!     → response.rs (domain errors → status + JSON)
//!     → Send to client
//! ```

pub mod handlers;
pub mod mock;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
