//! Ledger row types.

use serde::{Deserialize, Serialize};

/// Externally assigned warehouse item identifier.
pub type ItemId = u64;

/// Quantity and version of one item as read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub quantity: u64,
    pub version: u64,
}

/// A warehouse item row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub quantity: u64,
    pub version: u64,
}

impl Item {
    pub fn new(id: ItemId, stock: Stock) -> Self {
        Self {
            id,
            quantity: stock.quantity,
            version: stock.version,
        }
    }
}
