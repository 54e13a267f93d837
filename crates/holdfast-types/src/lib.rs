//! Shared type definitions for the Holdfast settlement simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Holdfast workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for game clients subscribing to engine events.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (resources, biomes, structures, disasters)
//! - [`structs`] -- Core entity structs (worlds, settlements, stock, queue)
//! - [`disaster`] -- Disaster events, lifecycle phases, and reports
//! - [`events`] -- Engine events and broadcast channels

pub mod disaster;
pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use disaster::{DisasterEvent, DisasterPhase, DisasterReport};
pub use enums::{
    Biome, DisasterStatus, DisasterType, FrequencyTier, ModifierKind, QueueStatus, ResourceKind,
    SeverityLevel, StructureCategory, StructureType, TransferStatus,
};
pub use events::{Channel, EngineEvent, PopulationWarningReason};
pub use ids::{
    DisasterId, PlayerId, QueueEntryId, RegionId, SettlementId, StructureId, TileId, TransferId,
    WorldId,
};
pub use structs::{
    ConstructionQueueEntry, ModifierAggregate, PopulationState, Region, ResourceAmounts,
    ResourceStock, ResourceTransfer, Settlement, StructureInstance, Tile, TileQuality, World,
    WorldTemplate,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for client-facing types.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::WorldId::export_all();
        let _ = crate::ids::RegionId::export_all();
        let _ = crate::ids::TileId::export_all();
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::SettlementId::export_all();
        let _ = crate::ids::StructureId::export_all();
        let _ = crate::ids::QueueEntryId::export_all();
        let _ = crate::ids::DisasterId::export_all();
        let _ = crate::ids::TransferId::export_all();

        // Enums
        let _ = crate::enums::ResourceKind::export_all();
        let _ = crate::enums::Biome::export_all();
        let _ = crate::enums::StructureCategory::export_all();
        let _ = crate::enums::StructureType::export_all();
        let _ = crate::enums::ModifierKind::export_all();
        let _ = crate::enums::DisasterType::export_all();
        let _ = crate::enums::SeverityLevel::export_all();
        let _ = crate::enums::FrequencyTier::export_all();
        let _ = crate::enums::DisasterStatus::export_all();
        let _ = crate::enums::QueueStatus::export_all();
        let _ = crate::enums::TransferStatus::export_all();

        // Structs
        let _ = crate::structs::ResourceAmounts::export_all();
        let _ = crate::structs::WorldTemplate::export_all();
        let _ = crate::structs::World::export_all();
        let _ = crate::structs::Region::export_all();
        let _ = crate::structs::TileQuality::export_all();
        let _ = crate::structs::Tile::export_all();
        let _ = crate::structs::Settlement::export_all();
        let _ = crate::structs::StructureInstance::export_all();
        let _ = crate::structs::ResourceStock::export_all();
        let _ = crate::structs::PopulationState::export_all();
        let _ = crate::structs::ConstructionQueueEntry::export_all();
        let _ = crate::structs::ModifierAggregate::export_all();
        let _ = crate::structs::ResourceTransfer::export_all();

        // Disasters
        let _ = crate::disaster::DisasterPhase::export_all();
        let _ = crate::disaster::DisasterEvent::export_all();
        let _ = crate::disaster::DisasterReport::export_all();

        // Events
        let _ = crate::events::Channel::export_all();
        let _ = crate::events::PopulationWarningReason::export_all();
        let _ = crate::events::EngineEvent::export_all();
    }
}
