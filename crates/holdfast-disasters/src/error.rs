//! Error types for the `holdfast-disasters` crate.

use holdfast_types::{DisasterId, RegionId};

/// Errors raised while scheduling or advancing disasters.
#[derive(Debug, thiserror::Error)]
pub enum DisasterError {
    /// A computed timestamp fell outside the representable range.
    #[error("timestamp out of range for disaster {0}")]
    TimeOutOfRange(DisasterId),

    /// The region has no tiles to sample a biome from.
    #[error("region {0} has no tiles")]
    EmptyRegion(RegionId),

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in disaster calculation")]
    ArithmeticOverflow,
}
