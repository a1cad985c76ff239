//! Inventory error taxonomy.

use crate::ledger::{ItemId, LedgerError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("item {0} not found")]
    NotFound(ItemId),

    #[error("item {id} was modified concurrently (expected version {expected}, found {actual})")]
    VersionConflict { id: ItemId, expected: u64, actual: u64 },

    #[error("item {id}: quantity {current} cannot change by {delta}")]
    InvalidQuantity { id: ItemId, current: u64, delta: i64 },

    #[error("item {id}: update gave up after {attempts} conflicting attempts")]
    UpdateExhausted { id: ItemId, attempts: u32 },

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<LedgerError> for InventoryError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(id) => InventoryError::NotFound(id),
            LedgerError::VersionConflict { id, expected, actual } => {
                InventoryError::VersionConflict { id, expected, actual }
            }
            LedgerError::Backend(msg) => InventoryError::Storage(msg),
        }
    }
}
