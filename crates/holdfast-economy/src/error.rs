//! Error types for the `holdfast-economy` crate.
//!
//! Every variant is a validation failure reported synchronously to the
//! caller. Nothing is partially applied when one of these is returned.

use holdfast_types::{ResourceAmounts, SettlementId, StructureId, StructureType};

/// Errors raised by economy rules.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// The settlement cannot pay for a build.
    #[error("insufficient resources: short by {shortfall:?}")]
    InsufficientResources {
        /// Per-resource amount still missing. Zero where the stock suffices.
        shortfall: ResourceAmounts,
    },

    /// A level outside `1..=15` was requested.
    #[error("invalid structure level {level}")]
    InvalidLevel {
        /// The rejected level.
        level: u8,
    },

    /// A health value outside `0..=100` was supplied.
    #[error("invalid health {health}")]
    InvalidHealth {
        /// The rejected health value.
        health: u8,
    },

    /// The upgrade target does not exist in the settlement.
    #[error("structure {structure_id} not found in settlement {settlement_id}")]
    UpgradeTargetNotFound {
        /// The missing structure.
        structure_id: StructureId,
        /// The settlement that was searched.
        settlement_id: SettlementId,
    },

    /// The upgrade target is a different structure type.
    #[error("structure {structure_id} is a {actual:?}, not a {requested:?}")]
    UpgradeTypeMismatch {
        /// The upgrade target.
        structure_id: StructureId,
        /// Type named in the request.
        requested: StructureType,
        /// Type of the existing structure.
        actual: StructureType,
    },

    /// An unfinished queue entry already targets this structure.
    #[error("structure {0} already has an upgrade queued")]
    UpgradeAlreadyQueued(StructureId),

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in economy calculation")]
    ArithmeticOverflow,
}
