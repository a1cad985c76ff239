//! Storage contract for the ledger.

use async_trait::async_trait;

use crate::ledger::types::{ItemId, Stock};

/// Errors surfaced by a ledger backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("item {0} not found")]
    NotFound(ItemId),

    #[error("item {id}: expected version {expected}, found {actual}")]
    VersionConflict { id: ItemId, expected: u64, actual: u64 },

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Persistence backend holding `(quantity, version)` per item.
///
/// Implementations must make `conditional_write` atomic per item id: of two
/// writers racing with the same `expected_version`, exactly one succeeds.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current quantity and version of `id`.
    async fn read(&self, id: ItemId) -> LedgerResult<Stock>;

    /// Set `quantity` if the stored version still equals `expected_version`.
    ///
    /// Returns the new version (`expected_version + 1`).
    async fn conditional_write(
        &self,
        id: ItemId,
        quantity: u64,
        expected_version: u64,
    ) -> LedgerResult<u64>;
}
