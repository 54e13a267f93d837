//! Events broadcast by the engine to connected clients.
//!
//! Every event is a JSON object tagged by `type`. Events are addressed to a
//! [`Channel`]: either a whole world or a single settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Biome, DisasterType, ResourceKind, SeverityLevel, StructureType};
use crate::ids::{
    DisasterId, QueueEntryId, RegionId, SettlementId, StructureId, TransferId, WorldId,
};
use crate::structs::ResourceAmounts;

/// Broadcast channel an event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Channel {
    /// Every client watching a world.
    World(WorldId),
    /// The owner of a single settlement.
    Settlement(SettlementId),
}

impl core::fmt::Display for Channel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::World(id) => write!(f, "world.{id}"),
            Self::Settlement(id) => write!(f, "settlement.{id}"),
        }
    }
}

/// Why a population warning was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PopulationWarningReason {
    /// Happiness is below the emigration threshold.
    LowHappiness,
    /// Food stock cannot cover consumption.
    FoodShortage,
    /// Water stock cannot cover consumption.
    WaterShortage,
}

/// An event emitted by the simulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum EngineEvent {
    // --- Resources ---
    /// Production and consumption were applied to a stockpile.
    ResourceUpdate {
        /// Settlement.
        settlement_id: SettlementId,
        /// Engine tick of the pass.
        tick: u64,
        /// Stock after the update.
        amounts: ResourceAmounts,
        /// Net change actually applied.
        delta: ResourceAmounts,
    },
    /// Projected stock, not persisted.
    ResourcePreview {
        /// Settlement.
        settlement_id: SettlementId,
        /// Engine tick of the projection.
        tick: u64,
        /// Projected stock.
        projected: ResourceAmounts,
        /// Net change per hour at current rates.
        net_per_hour: ResourceAmounts,
    },
    /// Production was discarded because storage is full.
    ResourceWaste {
        /// Settlement.
        settlement_id: SettlementId,
        /// Quantities that did not fit.
        wasted: ResourceAmounts,
    },
    /// One or more resources are above 90% of capacity.
    StorageWarning {
        /// Settlement.
        settlement_id: SettlementId,
        /// Resources near capacity.
        resources: Vec<ResourceKind>,
        /// Current capacity.
        capacity: ResourceAmounts,
    },
    /// Consumption exceeded the available stock.
    ResourceShortage {
        /// Settlement.
        settlement_id: SettlementId,
        /// Resources that ran out.
        resources: Vec<ResourceKind>,
    },

    // --- Population ---
    /// Population changed through natural growth or decline.
    PopulationGrowth {
        /// Settlement.
        settlement_id: SettlementId,
        /// Population before the pass.
        previous: u32,
        /// Population after the pass.
        current: u32,
        /// Population capacity.
        capacity: u32,
    },
    /// Population snapshot, sent every pass.
    PopulationState {
        /// Settlement.
        settlement_id: SettlementId,
        /// Current population.
        current: u32,
        /// Population capacity.
        capacity: u32,
        /// Happiness 0-100.
        happiness: u8,
    },
    /// Population is at risk.
    PopulationWarning {
        /// Settlement.
        settlement_id: SettlementId,
        /// Reasons for the warning.
        reasons: Vec<PopulationWarningReason>,
        /// Happiness 0-100.
        happiness: u8,
    },
    /// Immigrants joined the settlement.
    SettlerArrived {
        /// Settlement.
        settlement_id: SettlementId,
        /// Number of new settlers.
        count: u32,
        /// Population after arrival.
        population: u32,
    },
    /// Settlers left the settlement.
    SettlersDeparted {
        /// Settlement.
        settlement_id: SettlementId,
        /// Number of settlers who left.
        count: u32,
        /// Population after departure.
        population: u32,
    },

    // --- Disasters ---
    /// A disaster has been forecast.
    DisasterWarning {
        /// Disaster.
        disaster_id: DisasterId,
        /// Targeted region.
        region_id: RegionId,
        /// Disaster type.
        disaster_type: DisasterType,
        /// Severity bucket.
        severity_level: SeverityLevel,
        /// Affected biomes.
        affected_biomes: Vec<Biome>,
        /// When impact begins.
        impact_at: DateTime<Utc>,
    },
    /// Impact begins within 30 minutes.
    DisasterImminent {
        /// Disaster.
        disaster_id: DisasterId,
        /// Disaster type.
        disaster_type: DisasterType,
        /// When impact begins.
        impact_at: DateTime<Utc>,
    },
    /// Impact has begun.
    DisasterImpactStart {
        /// Disaster.
        disaster_id: DisasterId,
        /// Disaster type.
        disaster_type: DisasterType,
        /// Severity 0-100.
        severity: u8,
        /// When impact will end.
        impact_ends_at: DateTime<Utc>,
    },
    /// Damage increments were applied.
    DisasterDamageUpdate {
        /// Disaster.
        disaster_id: DisasterId,
        /// Increments applied so far.
        increments_applied: u32,
        /// Total increments for the impact.
        total_increments: u32,
        /// Impact progress 0-100.
        progress_percent: u8,
    },
    /// A structure lost health.
    StructureDamaged {
        /// Disaster responsible.
        disaster_id: DisasterId,
        /// Settlement owning the structure.
        settlement_id: SettlementId,
        /// Damaged structure.
        structure_id: StructureId,
        /// Structure type.
        structure_type: StructureType,
        /// Health removed by this increment.
        damage: u8,
        /// Health after the increment.
        health: u8,
    },
    /// Impact has ended.
    DisasterImpactEnd {
        /// Disaster.
        disaster_id: DisasterId,
        /// Disaster type.
        disaster_type: DisasterType,
    },
    /// Aftermath has begun.
    DisasterAftermath {
        /// Disaster.
        disaster_id: DisasterId,
        /// When production penalties fully decay.
        aftermath_ends_at: DateTime<Utc>,
    },
    /// Losses suffered by one settlement.
    CasualtiesReport {
        /// Disaster.
        disaster_id: DisasterId,
        /// Affected settlement.
        settlement_id: SettlementId,
        /// Settlers lost.
        casualties: u32,
        /// Structures destroyed.
        structures_lost: u32,
        /// Stock destroyed.
        resource_losses: ResourceAmounts,
        /// End of the discounted emergency-repair window.
        emergency_repair_until: DateTime<Utc>,
    },
    /// The disaster is over.
    DisasterResolved {
        /// Disaster.
        disaster_id: DisasterId,
        /// Resilience granted to each affected settlement.
        resilience_bonus: u32,
    },

    // --- Construction ---
    /// A queue entry took a build slot.
    ConstructionStarted {
        /// Settlement.
        settlement_id: SettlementId,
        /// Queue entry.
        entry_id: QueueEntryId,
        /// Structure being built.
        structure_type: StructureType,
        /// Level on completion.
        target_level: u8,
        /// Completion time.
        completes_at: DateTime<Utc>,
    },
    /// A build or upgrade finished.
    ConstructionComplete {
        /// Settlement.
        settlement_id: SettlementId,
        /// Queue entry.
        entry_id: QueueEntryId,
        /// Created or upgraded structure.
        structure_id: StructureId,
        /// Structure type.
        structure_type: StructureType,
        /// Structure level after completion.
        level: u8,
    },

    // --- Transfers ---
    /// A shipment arrived.
    TransferCompleted {
        /// Transfer.
        transfer_id: TransferId,
        /// Sender.
        source: SettlementId,
        /// Receiver.
        destination: SettlementId,
        /// Quantities delivered after clamping to capacity.
        delivered: ResourceAmounts,
    },
}

impl EngineEvent {
    /// The `type` tag of the event as it appears on the wire.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ResourceUpdate { .. } => "resource-update",
            Self::ResourcePreview { .. } => "resource-preview",
            Self::ResourceWaste { .. } => "resource-waste",
            Self::StorageWarning { .. } => "storage-warning",
            Self::ResourceShortage { .. } => "resource-shortage",
            Self::PopulationGrowth { .. } => "population-growth",
            Self::PopulationState { .. } => "population-state",
            Self::PopulationWarning { .. } => "population-warning",
            Self::SettlerArrived { .. } => "settler-arrived",
            Self::SettlersDeparted { .. } => "settlers-departed",
            Self::DisasterWarning { .. } => "disaster-warning",
            Self::DisasterImminent { .. } => "disaster-imminent",
            Self::DisasterImpactStart { .. } => "disaster-impact-start",
            Self::DisasterDamageUpdate { .. } => "disaster-damage-update",
            Self::StructureDamaged { .. } => "structure-damaged",
            Self::DisasterImpactEnd { .. } => "disaster-impact-end",
            Self::DisasterAftermath { .. } => "disaster-aftermath",
            Self::CasualtiesReport { .. } => "casualties-report",
            Self::DisasterResolved { .. } => "disaster-resolved",
            Self::ConstructionStarted { .. } => "construction-started",
            Self::ConstructionComplete { .. } => "construction-complete",
            Self::TransferCompleted { .. } => "transfer-completed",
        }
    }
}
