//! Versioned warehouse ledger.
//!
//! # Data Flow
//! ```text
//! read(id)                         → (quantity, version)
//! conditional_write(id, q, v)      → compare version == v, set q, version + 1
//! ```
//!
//! # Design Decisions
//! - Optimistic concurrency: conflicts are detected at write time, never by holding a read lock
//! - The compare-and-set is a single atomic step per item id
//! - Versions start at 1 and only grow; quantity never changes without a version bump

pub mod memory;
pub mod store;
pub mod types;

pub use memory::InMemoryLedger;
pub use store::{LedgerError, LedgerResult, LedgerStore};
pub use types::{Item, ItemId, Stock};
