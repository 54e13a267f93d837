//! Core entity structs for the Holdfast simulation.
//!
//! Covers worlds, regions, tiles, settlements, structures, stockpiles,
//! population, the construction queue, modifier aggregates, and transfers.
//! Disaster records live in [`crate::disaster`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    Biome, FrequencyTier, ModifierKind, QueueStatus, ResourceKind, StructureCategory,
    StructureType, TransferStatus,
};
use crate::ids::{
    PlayerId, QueueEntryId, RegionId, SettlementId, StructureId, TileId, TransferId, WorldId,
};

// ---------------------------------------------------------------------------
// ResourceAmounts
// ---------------------------------------------------------------------------

/// One [`Decimal`] quantity per resource kind.
///
/// Used for stockpiles, capacities, per-tick deltas, and multipliers alike.
/// All combinators saturate instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceAmounts {
    /// Food quantity.
    #[ts(as = "String")]
    pub food: Decimal,
    /// Water quantity.
    #[ts(as = "String")]
    pub water: Decimal,
    /// Wood quantity.
    #[ts(as = "String")]
    pub wood: Decimal,
    /// Stone quantity.
    #[ts(as = "String")]
    pub stone: Decimal,
    /// Ore quantity.
    #[ts(as = "String")]
    pub ore: Decimal,
}

impl ResourceAmounts {
    /// All five quantities zero.
    pub const ZERO: Self = Self::uniform(Decimal::ZERO);

    /// All five quantities one (the identity multiplier).
    pub const ONE: Self = Self::uniform(Decimal::ONE);

    /// The same quantity for every resource.
    pub const fn uniform(value: Decimal) -> Self {
        Self {
            food: value,
            water: value,
            wood: value,
            stone: value,
            ore: value,
        }
    }

    /// Quantity of a single resource.
    pub const fn get(&self, kind: ResourceKind) -> Decimal {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Ore => self.ore,
        }
    }

    /// Overwrite the quantity of a single resource.
    pub const fn set(&mut self, kind: ResourceKind, value: Decimal) {
        match kind {
            ResourceKind::Food => self.food = value,
            ResourceKind::Water => self.water = value,
            ResourceKind::Wood => self.wood = value,
            ResourceKind::Stone => self.stone = value,
            ResourceKind::Ore => self.ore = value,
        }
    }

    /// Iterate `(kind, quantity)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, Decimal)> + '_ {
        ResourceKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    /// Apply `f` to every resource.
    #[must_use]
    pub fn map(self, mut f: impl FnMut(ResourceKind, Decimal) -> Decimal) -> Self {
        let mut out = Self::ZERO;
        for kind in ResourceKind::ALL {
            out.set(kind, f(kind, self.get(kind)));
        }
        out
    }

    /// Combine two amounts resource by resource.
    #[must_use]
    pub fn zip_with(
        self,
        other: Self,
        mut f: impl FnMut(ResourceKind, Decimal, Decimal) -> Decimal,
    ) -> Self {
        self.map(|kind, value| f(kind, value, other.get(kind)))
    }

    /// Resource-wise saturating sum.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        self.zip_with(other, |_, a, b| a.saturating_add(b))
    }

    /// Resource-wise saturating difference.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        self.zip_with(other, |_, a, b| a.saturating_sub(b))
    }

    /// Resource-wise saturating product.
    #[must_use]
    pub fn saturating_mul(self, other: Self) -> Self {
        self.zip_with(other, |_, a, b| a.saturating_mul(b))
    }

    /// Multiply every resource by the same factor.
    #[must_use]
    pub fn scale(self, factor: Decimal) -> Self {
        self.map(|_, value| value.saturating_mul(factor))
    }

    /// Whether every quantity is zero.
    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, value)| value.is_zero())
    }
}

// ---------------------------------------------------------------------------
// Worlds, regions, tiles
// ---------------------------------------------------------------------------

/// Per-world tuning knobs chosen when the world was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldTemplate {
    /// Template name (e.g. "standard", "apocalypse").
    pub name: String,
    /// How often disasters roll.
    pub disaster_frequency: FrequencyTier,
    /// Scales rolled disaster severity.
    #[ts(as = "String")]
    pub severity_multiplier: Decimal,
    /// Scales disaster warning lead time.
    #[ts(as = "String")]
    pub warning_time_multiplier: Decimal,
    /// Scales every settlement's production.
    #[ts(as = "String")]
    pub production_multiplier: Decimal,
}

impl Default for WorldTemplate {
    fn default() -> Self {
        Self {
            name: String::from("standard"),
            disaster_frequency: FrequencyTier::Normal,
            severity_multiplier: Decimal::ONE,
            warning_time_multiplier: Decimal::ONE,
            production_multiplier: Decimal::ONE,
        }
    }
}

/// A persistent world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct World {
    /// World identifier.
    pub id: WorldId,
    /// Display name.
    pub name: String,
    /// Inactive worlds are skipped by every cadence.
    pub active: bool,
    /// Tuning template.
    pub template: WorldTemplate,
}

/// A region of tiles inside a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Region {
    /// Region identifier.
    pub id: RegionId,
    /// Owning world.
    pub world_id: WorldId,
    /// Display name.
    pub name: String,
    /// Number of tiles of each biome in the region.
    pub biome_tiles: BTreeMap<Biome, u32>,
}

/// Per-resource tile quality score (0-100, may exceed 100 on rich tiles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TileQuality {
    /// Food quality.
    pub food: u32,
    /// Water quality.
    pub water: u32,
    /// Wood quality.
    pub wood: u32,
    /// Stone quality.
    pub stone: u32,
    /// Ore quality.
    pub ore: u32,
}

impl TileQuality {
    /// Quality score for one resource.
    pub const fn get(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Water => self.water,
            ResourceKind::Wood => self.wood,
            ResourceKind::Stone => self.stone,
            ResourceKind::Ore => self.ore,
        }
    }
}

/// A map tile. Immutable during simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Tile {
    /// Tile identifier.
    pub id: TileId,
    /// Region the tile belongs to.
    pub region_id: RegionId,
    /// Tile biome.
    pub biome: Biome,
    /// Resource quality scores.
    pub quality: TileQuality,
}

// ---------------------------------------------------------------------------
// Settlements and structures
// ---------------------------------------------------------------------------

/// A player settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Settlement {
    /// Settlement identifier.
    pub id: SettlementId,
    /// Owning player.
    pub player_id: PlayerId,
    /// World the settlement lives in.
    pub world_id: WorldId,
    /// Region of the settlement's tile.
    pub region_id: RegionId,
    /// Tile the settlement sits on.
    pub tile_id: TileId,
    /// Display name.
    pub name: String,
    /// Cumulative disaster-survival bonus.
    pub resilience: u32,
    /// End of the discounted emergency-repair window, if one is open.
    pub emergency_repair_until: Option<DateTime<Utc>>,
}

/// A structure standing in a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StructureInstance {
    /// Structure identifier.
    pub id: StructureId,
    /// Owning settlement.
    pub settlement_id: SettlementId,
    /// Extractor or building.
    pub category: StructureCategory,
    /// Catalogue type.
    pub structure_type: StructureType,
    /// Level, starting at 1.
    pub level: u8,
    /// Health 0-100. `None` is treated as full health.
    pub health: Option<u8>,
    /// Workers assigned to the structure.
    pub population_assigned: u32,
    /// When construction completed.
    pub built_at: DateTime<Utc>,
}

impl StructureInstance {
    /// Health with `None` resolved to 100.
    pub fn effective_health(&self) -> u8 {
        self.health.unwrap_or(100).min(100)
    }
}

// ---------------------------------------------------------------------------
// Stockpile and population
// ---------------------------------------------------------------------------

/// A settlement's stockpile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceStock {
    /// Owning settlement.
    pub settlement_id: SettlementId,
    /// Current quantities, always within `[0, capacity]`.
    pub amounts: ResourceAmounts,
    /// Last time production/consumption was applied.
    pub updated_at: DateTime<Utc>,
}

/// A settlement's population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PopulationState {
    /// Owning settlement.
    pub settlement_id: SettlementId,
    /// Current population, at least 1.
    pub current: u32,
    /// Happiness 0-100.
    pub happiness: u8,
    /// Engine tick of the last population pass.
    pub last_growth_tick: u64,
    /// Fractional growth not yet realised as whole settlers.
    pub growth_carry: f64,
    /// Wall-clock time of the last population pass.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Construction queue
// ---------------------------------------------------------------------------

/// One construction or upgrade request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConstructionQueueEntry {
    /// Entry identifier.
    pub id: QueueEntryId,
    /// Settlement the entry belongs to.
    pub settlement_id: SettlementId,
    /// Structure being built.
    pub structure_type: StructureType,
    /// Level the structure will have on completion.
    pub target_level: u8,
    /// Existing structure being upgraded, if this is an upgrade.
    pub upgrade_of: Option<StructureId>,
    /// Queue status.
    pub status: QueueStatus,
    /// FIFO order among queued entries of the settlement.
    pub position: u32,
    /// Emergency builds finish in half the time.
    pub is_emergency: bool,
    /// When the request was accepted.
    pub queued_at: DateTime<Utc>,
    /// When the entry took a build slot.
    pub started_at: Option<DateTime<Utc>>,
    /// When the entry will complete.
    pub completes_at: Option<DateTime<Utc>>,
    /// When the entry completed.
    pub completed_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Cached total of one modifier kind for one settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ModifierAggregate {
    /// Owning settlement.
    pub settlement_id: SettlementId,
    /// Modifier kind.
    pub kind: ModifierKind,
    /// Summed value.
    #[ts(as = "String")]
    pub total: Decimal,
    /// Number of contributing structures.
    pub source_count: u32,
    /// Contributing structures, for display.
    pub contributors: Vec<StructureId>,
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// A resource shipment between two settlements.
///
/// The source stock is debited when the transfer is created (outside the
/// engine). The engine credits the destination once `due_at` has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceTransfer {
    /// Transfer identifier.
    pub id: TransferId,
    /// Sending settlement.
    pub source: SettlementId,
    /// Receiving settlement.
    pub destination: SettlementId,
    /// Quantities in transit.
    pub amounts: ResourceAmounts,
    /// Arrival time.
    pub due_at: DateTime<Utc>,
    /// Delivery status.
    pub status: TransferStatus,
    /// When the transfer was delivered.
    pub completed_at: Option<DateTime<Utc>>,
}
