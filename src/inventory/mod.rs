//! Inventory update orchestration.
//!
//! # Data Flow
//! ```text
//! increment request
//!     → read (quantity, version) from the ledger
//!     → compute quantity + delta (reject below zero)
//!     → conditional write with the version that was read
//!     → atomic path: retry the whole cycle on conflict, bounded
//!     → naive path: surface the conflict to the caller
//! ```

pub mod error;
pub mod service;

pub use error::InventoryError;
pub use service::InventoryUpdateService;
