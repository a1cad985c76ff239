//! In-process ledger backend.
//!
//! # Responsibilities
//! - Hold item rows in a concurrent map
//! - Perform the compare-and-set under the item's shard lock
//! - Optionally delay each round trip to reproduce remote-store interleavings

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::LedgerConfig;
use crate::ledger::store::{LedgerError, LedgerResult, LedgerStore};
use crate::ledger::types::{Item, ItemId, Stock};
use crate::observability::metrics;

/// Ledger kept in a [`DashMap`].
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    items: DashMap<ItemId, Stock>,
    latency: Option<Duration>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger whose reads and writes each take `latency` before touching the map.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            items: DashMap::new(),
            latency: (!latency.is_zero()).then_some(latency),
        }
    }

    /// Build from the `[ledger]` section, provisioning its seed items.
    pub fn from_config(config: &LedgerConfig) -> Self {
        let ledger = Self::with_latency(Duration::from_millis(config.simulated_latency_ms));
        for seed in &config.seed {
            ledger.provision(seed.id, seed.quantity);
        }
        tracing::info!(items = ledger.len(), "Ledger provisioned");
        ledger
    }

    /// Create an item at version 1.
    ///
    /// An existing row is left untouched and returned as is.
    pub fn provision(&self, id: ItemId, quantity: u64) -> Item {
        let stock = *self.items.entry(id).or_insert(Stock { quantity, version: 1 });
        Item::new(id, stock)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    async fn round_trip(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn read(&self, id: ItemId) -> LedgerResult<Stock> {
        let stock = self
            .items
            .get(&id)
            .map(|row| *row.value())
            .ok_or(LedgerError::NotFound(id))?;
        // the snapshot is taken before the simulated trip back to the caller
        self.round_trip().await;
        Ok(stock)
    }

    async fn conditional_write(
        &self,
        id: ItemId,
        quantity: u64,
        expected_version: u64,
    ) -> LedgerResult<u64> {
        self.round_trip().await;

        let mut row = match self.items.entry(id) {
            Entry::Occupied(row) => row,
            Entry::Vacant(_) => return Err(LedgerError::NotFound(id)),
        };

        let current = *row.get();
        if current.version != expected_version {
            metrics::record_ledger_write("conflict");
            tracing::debug!(
                item_id = id,
                expected = expected_version,
                actual = current.version,
                "Version conflict"
            );
            return Err(LedgerError::VersionConflict {
                id,
                expected: expected_version,
                actual: current.version,
            });
        }

        let version = current.version + 1;
        row.insert(Stock { quantity, version });
        metrics::record_ledger_write("committed");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_read_unknown_item() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.read(9).await, Err(LedgerError::NotFound(9)));
        assert_eq!(
            ledger.conditional_write(9, 1, 1).await,
            Err(LedgerError::NotFound(9))
        );
    }

    #[tokio::test]
    async fn test_write_bumps_version_once() {
        let ledger = InMemoryLedger::new();
        ledger.provision(1, 10);

        assert_eq!(ledger.conditional_write(1, 11, 1).await, Ok(2));
        assert_eq!(ledger.read(1).await, Ok(Stock { quantity: 11, version: 2 }));
    }

    #[tokio::test]
    async fn test_stale_version_rejected_without_change() {
        let ledger = InMemoryLedger::new();
        ledger.provision(1, 10);
        ledger.conditional_write(1, 11, 1).await.expect("first write");

        assert_eq!(
            ledger.conditional_write(1, 50, 1).await,
            Err(LedgerError::VersionConflict { id: 1, expected: 1, actual: 2 })
        );
        assert_eq!(ledger.read(1).await, Ok(Stock { quantity: 11, version: 2 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_writers_exactly_one_wins() {
        for _ in 0..50 {
            let ledger = Arc::new(InMemoryLedger::new());
            ledger.provision(7, 0);

            let writers: Vec<_> = (0..8u64)
                .map(|n| {
                    let ledger = ledger.clone();
                    tokio::spawn(async move { ledger.conditional_write(7, n, 1).await })
                })
                .collect();

            let mut wins = 0;
            for writer in writers {
                match writer.await.expect("task completed") {
                    Ok(version) => {
                        assert_eq!(version, 2);
                        wins += 1;
                    }
                    Err(LedgerError::VersionConflict { actual: 2, .. }) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            assert_eq!(wins, 1);
            assert_eq!(ledger.read(7).await.expect("exists").version, 2);
        }
    }

    #[tokio::test]
    async fn test_provision_never_rewinds_an_existing_row() {
        let ledger = InMemoryLedger::new();
        ledger.provision(1, 10);
        ledger.conditional_write(1, 4, 1).await.expect("first write");

        let item = ledger.provision(1, 99);
        assert_eq!((item.quantity, item.version), (4, 2));
        assert_eq!(ledger.read(1).await, Ok(Stock { quantity: 4, version: 2 }));
    }

    #[tokio::test]
    async fn test_seeded_from_config() {
        let ledger = InMemoryLedger::from_config(&LedgerConfig::default());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.read(1).await, Ok(Stock { quantity: 10, version: 1 }));
    }
}
