//! Error types for the `holdfast-core` crate.

use holdfast_types::{ResourceAmounts, SettlementId, WorldId};

use holdfast_disasters::DisasterError;
use holdfast_economy::EconomyError;

/// Errors surfaced by a store implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored value could not be decoded.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Errors surfaced by an event publisher.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The event could not be serialized.
    #[error("failed to encode event: {0}")]
    Encode(String),

    /// The transport rejected the message.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised while running engine passes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A request failed validation. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(#[from] EconomyError),

    /// Stock no longer covers the cost by the time it was deducted.
    #[error("settlement {settlement_id} cannot afford the request, short by {shortfall:?}")]
    Unaffordable {
        /// Settlement that made the request.
        settlement_id: SettlementId,
        /// Missing quantities.
        shortfall: Box<ResourceAmounts>,
    },

    /// A disaster computation failed.
    #[error("disaster error: {0}")]
    Disaster(#[from] DisasterError),

    /// A settlement disappeared mid-pipeline.
    #[error("settlement {0} not found")]
    SettlementNotFound(SettlementId),

    /// A world disappeared mid-pipeline.
    #[error("world {0} not found")]
    WorldNotFound(WorldId),

    /// A row the settlement needs is missing (tile, stock, population).
    #[error("settlement {settlement_id} is missing its {what}")]
    MissingState {
        /// Settlement being processed.
        settlement_id: SettlementId,
        /// Which piece of state is missing.
        what: &'static str,
    },

    /// Other writers kept changing the stock between read and write.
    #[error("settlement {0} stock kept changing during the update")]
    StockContention(SettlementId),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Whether the failure means the unit should be skipped rather than
    /// reported as an infrastructure fault.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SettlementNotFound(_) | Self::WorldNotFound(_) | Self::MissingState { .. }
        )
    }
}
