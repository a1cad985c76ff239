//! Read-modify-write updates over the versioned ledger.

use std::sync::Arc;

use crate::config::LedgerConfig;
use crate::inventory::error::InventoryError;
use crate::ledger::{Item, ItemId, LedgerStore};
use crate::observability::metrics;

/// Orchestrates item updates against a [`LedgerStore`].
#[derive(Clone)]
pub struct InventoryUpdateService {
    store: Arc<dyn LedgerStore>,
    max_attempts: u32,
}

impl InventoryUpdateService {
    /// `max_attempts` bounds the cycles tried by [`increment_atomic`](Self::increment_atomic).
    pub fn new(store: Arc<dyn LedgerStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self::new(store, config.max_update_attempts)
    }

    pub async fn get(&self, id: ItemId) -> Result<Item, InventoryError> {
        let stock = self.store.read(id).await?;
        Ok(Item::new(id, stock))
    }

    /// One read/compute/conditional-write cycle.
    ///
    /// A concurrent writer surfaces as [`InventoryError::VersionConflict`];
    /// retrying is up to the caller.
    pub async fn increment(&self, id: ItemId, delta: i64) -> Result<Item, InventoryError> {
        let stock = self.store.read(id).await?;
        let quantity = stock
            .quantity
            .checked_add_signed(delta)
            .ok_or(InventoryError::InvalidQuantity {
                id,
                current: stock.quantity,
                delta,
            })?;

        let version = self.store.conditional_write(id, quantity, stock.version).await?;
        Ok(Item { id, quantity, version })
    }

    /// Single-cycle increment that surfaces conflicts directly.
    ///
    /// Racing callers lose updates: the loser gets a conflict and its delta
    /// is never applied.
    pub async fn increment_naive(&self, id: ItemId, delta: i64) -> Result<Item, InventoryError> {
        let result = self.increment(id, delta).await;
        metrics::record_inventory_update("naive", outcome_label(&result));
        result
    }

    /// Increment that re-runs the whole cycle on conflict, up to `max_attempts` times.
    pub async fn increment_atomic(&self, id: ItemId, delta: i64) -> Result<Item, InventoryError> {
        for attempt in 1..=self.max_attempts {
            match self.increment(id, delta).await {
                Ok(item) => {
                    if attempt > 1 {
                        tracing::debug!(item_id = id, attempt, version = item.version, "Increment committed after conflict");
                    }
                    metrics::record_inventory_update("atomic", "committed");
                    return Ok(item);
                }
                Err(InventoryError::VersionConflict { .. }) => {
                    tracing::debug!(item_id = id, attempt, "Increment hit a version conflict");
                    tokio::task::yield_now().await;
                }
                Err(e) => {
                    metrics::record_inventory_update("atomic", error_label(&e));
                    return Err(e);
                }
            }
        }

        tracing::warn!(item_id = id, attempts = self.max_attempts, "Increment exhausted conflict retries");
        metrics::record_inventory_update("atomic", "exhausted");
        Err(InventoryError::UpdateExhausted {
            id,
            attempts: self.max_attempts,
        })
    }

    /// Overwrite the quantity of `id` (the naive PUT path).
    ///
    /// The expected version is `expected_version` when the client sent one,
    /// otherwise whatever the read returned. No retry on conflict.
    pub async fn set_quantity(
        &self,
        id: ItemId,
        quantity: u64,
        expected_version: Option<u64>,
    ) -> Result<Item, InventoryError> {
        let result = async {
            let stock = self.store.read(id).await?;
            let expected = expected_version.unwrap_or(stock.version);
            let version = self.store.conditional_write(id, quantity, expected).await?;
            Ok::<_, InventoryError>(Item { id, quantity, version })
        }
        .await;

        metrics::record_inventory_update("put", outcome_label(&result));
        result
    }
}

fn outcome_label<T>(result: &Result<T, InventoryError>) -> &'static str {
    match result {
        Ok(_) => "committed",
        Err(e) => error_label(e),
    }
}

fn error_label(error: &InventoryError) -> &'static str {
    match error {
        InventoryError::NotFound(_) => "not_found",
        InventoryError::VersionConflict { .. } => "conflict",
        InventoryError::InvalidQuantity { .. } => "invalid",
        InventoryError::UpdateExhausted { .. } => "exhausted",
        InventoryError::Storage(_) => "error",
    }
}
