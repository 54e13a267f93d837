//! Structure catalogue: category, extracted resource, build time, cost, and
//! per-level modifier contributions.
//!
//! - [`blueprint`] returns the static blueprint for each [`StructureType`]
//! - [`build_duration`] applies the emergency halving
//! - [`build_cost`] scales cost by target level and the emergency surcharge
//! - [`contributions`] lists the modifiers a structure provides at a level

use chrono::TimeDelta;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use holdfast_types::{ModifierKind, ResourceAmounts, ResourceKind, StructureCategory, StructureType};

/// Highest level any structure can reach.
pub const MAX_LEVEL: u8 = 15;

/// Cost multiplier for emergency construction.
pub const EMERGENCY_COST_MULTIPLIER: Decimal = dec!(1.5);

const HALF_HOUR: u32 = 1_800;
const HOUR: u32 = 3_600;
const TWO_HOURS: u32 = 7_200;
const DAY: u32 = 86_400;

/// Static description of a structure type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blueprint {
    /// The structure type described.
    pub structure_type: StructureType,
    /// Extractor or building.
    pub category: StructureCategory,
    /// Resource produced, for extractors.
    pub extracts: Option<ResourceKind>,
    /// Standard build time in seconds.
    pub build_seconds: u32,
    /// Level-1 construction cost.
    pub cost: ResourceAmounts,
}

/// Shorthand for a level-1 cost row.
const fn cost(food: u32, water: u32, wood: u32, stone: u32, ore: u32) -> ResourceAmounts {
    ResourceAmounts {
        food: Decimal::from_parts(food, 0, 0, false, 0),
        water: Decimal::from_parts(water, 0, 0, false, 0),
        wood: Decimal::from_parts(wood, 0, 0, false, 0),
        stone: Decimal::from_parts(stone, 0, 0, false, 0),
        ore: Decimal::from_parts(ore, 0, 0, false, 0),
    }
}

const fn extractor(
    structure_type: StructureType,
    extracts: ResourceKind,
    build_seconds: u32,
    cost: ResourceAmounts,
) -> Blueprint {
    Blueprint {
        structure_type,
        category: StructureCategory::Extractor,
        extracts: Some(extracts),
        build_seconds,
        cost,
    }
}

const fn building(structure_type: StructureType, build_seconds: u32, cost: ResourceAmounts) -> Blueprint {
    Blueprint {
        structure_type,
        category: StructureCategory::Building,
        extracts: None,
        build_seconds,
        cost,
    }
}

/// Return the canonical blueprint for a given [`StructureType`].
pub const fn blueprint(structure_type: StructureType) -> Blueprint {
    use StructureType as T;
    match structure_type {
        // ---- Extractors ----
        T::Farm => extractor(T::Farm, ResourceKind::Food, HALF_HOUR, cost(0, 0, 30, 10, 0)),
        T::Well => extractor(T::Well, ResourceKind::Water, HALF_HOUR, cost(0, 0, 10, 30, 0)),
        T::LumberCamp => extractor(
            T::LumberCamp,
            ResourceKind::Wood,
            2_700,
            cost(0, 0, 20, 10, 0),
        ),
        T::Quarry => extractor(T::Quarry, ResourceKind::Stone, HOUR, cost(0, 0, 40, 0, 0)),
        T::Mine => extractor(T::Mine, ResourceKind::Ore, TWO_HOURS, cost(0, 0, 60, 40, 0)),

        // ---- Housing ----
        T::Shelter => building(T::Shelter, 0, cost(0, 0, 10, 0, 0)),
        T::House => building(T::House, HOUR, cost(0, 0, 50, 20, 0)),

        // ---- Storage ----
        T::Granary => building(T::Granary, TWO_HOURS, cost(0, 0, 60, 40, 0)),
        T::Cistern => building(T::Cistern, TWO_HOURS, cost(0, 0, 20, 80, 0)),
        T::Stockyard => building(T::Stockyard, TWO_HOURS, cost(0, 0, 80, 40, 0)),
        T::Warehouse => building(T::Warehouse, 14_400, cost(0, 0, 150, 100, 20)),

        // ---- Amenities ----
        T::Workshop => building(T::Workshop, 10_800, cost(0, 0, 80, 60, 10)),
        T::Tavern => building(T::Tavern, 14_400, cost(50, 0, 120, 60, 0)),
        T::Temple => building(T::Temple, 43_200, cost(0, 0, 150, 300, 50)),
        T::TownHall => building(T::TownHall, DAY, cost(0, 0, 300, 400, 100)),
        T::GuildMonument => building(T::GuildMonument, 2_592_000, cost(0, 0, 2000, 5000, 1000)),
    }
}

/// Build duration for a structure, halved for emergency construction.
pub fn build_duration(structure_type: StructureType, emergency: bool) -> TimeDelta {
    let seconds = blueprint(structure_type).build_seconds;
    let seconds = if emergency {
        seconds.checked_div(2).unwrap_or(0)
    } else {
        seconds
    };
    TimeDelta::seconds(i64::from(seconds))
}

/// Cost of building `structure_type` to `target_level`.
///
/// The level-1 cost scales linearly with the target level; emergency builds
/// pay a 50% surcharge.
pub fn build_cost(structure_type: StructureType, target_level: u8, emergency: bool) -> ResourceAmounts {
    let scaled = blueprint(structure_type)
        .cost
        .scale(Decimal::from(target_level.max(1)));
    if emergency {
        scaled.scale(EMERGENCY_COST_MULTIPLIER)
    } else {
        scaled
    }
}

/// Modifier contributions of one structure at `level`.
///
/// Levels are clamped into `1..=MAX_LEVEL`.
pub fn contributions(structure_type: StructureType, level: u8) -> Vec<(ModifierKind, Decimal)> {
    let level = Decimal::from(level.clamp(1, MAX_LEVEL));
    let per_level = |amount: i64| Decimal::from(amount).saturating_mul(level);
    match structure_type {
        StructureType::Shelter => vec![(ModifierKind::PopulationCapacity, Decimal::from(3))],
        StructureType::House => vec![(ModifierKind::PopulationCapacity, per_level(5))],
        StructureType::TownHall => vec![
            (ModifierKind::PopulationCapacity, per_level(10)),
            (ModifierKind::MoraleBonus, Decimal::from(5)),
        ],
        StructureType::Warehouse => vec![(ModifierKind::StorageCapacity, per_level(500))],
        StructureType::Granary => vec![(ModifierKind::FoodStorage, per_level(500))],
        StructureType::Cistern => vec![(ModifierKind::WaterStorage, per_level(500))],
        StructureType::Stockyard => vec![
            (ModifierKind::WoodStorage, per_level(500)),
            (ModifierKind::StoneStorage, per_level(500)),
            (ModifierKind::OreStorage, per_level(500)),
        ],
        StructureType::Tavern => vec![(ModifierKind::MoraleBonus, per_level(5))],
        StructureType::Temple => vec![(ModifierKind::MoraleBonus, per_level(8))],
        StructureType::GuildMonument => vec![
            (ModifierKind::MoraleBonus, Decimal::from(15)),
            (ModifierKind::PopulationCapacity, Decimal::from(20)),
        ],
        StructureType::Farm
        | StructureType::Well
        | StructureType::LumberCamp
        | StructureType::Quarry
        | StructureType::Mine
        | StructureType::Workshop => Vec::new(),
    }
}
