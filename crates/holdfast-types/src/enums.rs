//! Enumeration types for the Holdfast simulation.
//!
//! Resources, biomes, structure catalogue keys, modifier kinds, disaster
//! classifications, and the status enums of queue entries and transfers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// One of the five stockpiled settlement resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ResourceKind {
    /// Food, consumed by population.
    Food,
    /// Water, consumed by population.
    Water,
    /// Wood, a construction material.
    Wood,
    /// Stone, a construction material.
    Stone,
    /// Ore, an advanced construction material.
    Ore,
}

impl ResourceKind {
    /// All resource kinds in canonical order.
    pub const ALL: [Self; 5] = [Self::Food, Self::Water, Self::Wood, Self::Stone, Self::Ore];
}

// ---------------------------------------------------------------------------
// Biomes
// ---------------------------------------------------------------------------

/// Biome of a tile. Drives extraction efficiency and disaster risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum Biome {
    /// Open temperate plains.
    Grassland,
    /// Dense woodland.
    Forest,
    /// High rocky terrain.
    Mountain,
    /// Arid sand and scrub.
    Desert,
    /// Frozen lowlands.
    Tundra,
    /// Wet marshland.
    Swamp,
    /// Shoreline.
    Coastal,
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// Category of a structure instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum StructureCategory {
    /// Converts tile quality into resource production.
    Extractor,
    /// Everything else: housing, storage, amenities.
    Building,
}

/// A buildable structure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum StructureType {
    // --- Extractors ---
    /// Produces food.
    Farm,
    /// Produces water.
    Well,
    /// Produces wood.
    LumberCamp,
    /// Produces stone.
    Quarry,
    /// Produces ore.
    Mine,

    // --- Buildings ---
    /// Starter housing, built instantly.
    Shelter,
    /// Family housing.
    House,
    /// Food storage.
    Granary,
    /// Water storage.
    Cistern,
    /// Wood, stone, and ore storage.
    Stockyard,
    /// General storage for every resource.
    Warehouse,
    /// Repair amenity. Enables passive repair.
    Workshop,
    /// Morale amenity.
    Tavern,
    /// Morale amenity.
    Temple,
    /// Civic centre. Housing and morale.
    TownHall,
    /// Top-tier guild monument.
    GuildMonument,
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// A structure-derived modifier kind, aggregated per settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ModifierKind {
    /// Adds to the population cap.
    PopulationCapacity,
    /// Adds storage capacity to all five resources.
    StorageCapacity,
    /// Adds food storage capacity.
    FoodStorage,
    /// Adds water storage capacity.
    WaterStorage,
    /// Adds wood storage capacity.
    WoodStorage,
    /// Adds stone storage capacity.
    StoneStorage,
    /// Adds ore storage capacity.
    OreStorage,
    /// Adds to settlement happiness.
    MoraleBonus,
}

impl ModifierKind {
    /// Canonical persisted name of the modifier kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PopulationCapacity => "population_capacity",
            Self::StorageCapacity => "storage_capacity",
            Self::FoodStorage => "food_storage",
            Self::WaterStorage => "water_storage",
            Self::WoodStorage => "wood_storage",
            Self::StoneStorage => "stone_storage",
            Self::OreStorage => "ore_storage",
            Self::MoraleBonus => "morale_bonus",
        }
    }

    /// The resource-specific storage modifier for a resource.
    pub const fn storage_for(resource: ResourceKind) -> Self {
        match resource {
            ResourceKind::Food => Self::FoodStorage,
            ResourceKind::Water => Self::WaterStorage,
            ResourceKind::Wood => Self::WoodStorage,
            ResourceKind::Stone => Self::StoneStorage,
            ResourceKind::Ore => Self::OreStorage,
        }
    }
}

// ---------------------------------------------------------------------------
// Disasters
// ---------------------------------------------------------------------------

/// A natural disaster type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum DisasterType {
    /// Prolonged lack of rain.
    Drought,
    /// Uncontrolled fire.
    Wildfire,
    /// Rising water.
    Flood,
    /// Severe snowstorm.
    Blizzard,
    /// Ground shaking.
    Earthquake,
    /// Slope collapse.
    Landslide,
    /// Wind-driven sand.
    Sandstorm,
    /// Crop-eating swarm.
    Locusts,
    /// Tropical storm.
    Hurricane,
}

/// Bucketed classification of a disaster's numeric severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum SeverityLevel {
    /// Severity 0-24.
    Mild,
    /// Severity 25-49.
    Moderate,
    /// Severity 50-74.
    Major,
    /// Severity 75-100.
    Catastrophic,
}

impl SeverityLevel {
    /// Classify a numeric severity. Monotonic in `severity`.
    pub const fn from_severity(severity: u8) -> Self {
        match severity {
            0..=24 => Self::Mild,
            25..=49 => Self::Moderate,
            50..=74 => Self::Major,
            _ => Self::Catastrophic,
        }
    }
}

/// World-template disaster frequency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum FrequencyTier {
    /// 0.5% per region per hour.
    Rare,
    /// 1.5% per region per hour.
    Normal,
    /// 4% per region per hour.
    Frequent,
    /// 8% per region per hour.
    Extreme,
}

/// Lifecycle status of a disaster, ordered by progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum DisasterStatus {
    /// Created, no notice sent yet.
    Scheduled,
    /// Players have been warned.
    Warning,
    /// Damage is being applied.
    Impact,
    /// Recovering; production penalties decay.
    Aftermath,
    /// Terminal.
    Resolved,
}

// ---------------------------------------------------------------------------
// Construction and transfers
// ---------------------------------------------------------------------------

/// Status of a construction queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum QueueStatus {
    /// Waiting for a free build slot.
    Queued,
    /// Occupying one of the settlement's build slots.
    InProgress,
    /// Finished. Terminal.
    Complete,
}

/// Status of a cross-settlement resource transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum TransferStatus {
    /// Resources deducted from the source, not yet delivered.
    Pending,
    /// Delivered to the destination. Terminal.
    Completed,
}
