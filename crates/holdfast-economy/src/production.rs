//! Production and consumption calculator.
//!
//! Production of each resource on a settlement tile is:
//!
//! ```text
//! quality / 100 x biome_efficiency x BASE_RATE x scaling x ticks x world_multiplier
//! ```
//!
//! where `scaling` is 1 when no extractor of the resource stands (ambient
//! gathering), and `tier_multiplier(level) x effectiveness(health)` of the
//! best extractor otherwise. Only the highest-level extractor of a
//! resource counts; equal levels resolve to the healthier structure.
//!
//! Consumption is per settler: 18 food and 36 water per 3600 ticks.
//! Structure maintenance of wood, stone, and ore is configurable and
//! defaults to zero.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use holdfast_types::{Biome, ResourceAmounts, ResourceKind, StructureCategory, StructureInstance, Tile};

use crate::biome;
use crate::blueprint::{self, MAX_LEVEL};

/// Base production per tick at quality 100 and efficiency 1.0.
pub const BASE_RATE: Decimal = dec!(0.2);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Consumption per settler (or per structure, for maintenance) per 3600
/// ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRates {
    /// Food eaten per settler.
    #[serde(default = "default_food_rate")]
    pub food: Decimal,
    /// Water drunk per settler.
    #[serde(default = "default_water_rate")]
    pub water: Decimal,
    /// Wood maintenance per structure.
    #[serde(default)]
    pub wood: Decimal,
    /// Stone maintenance per structure.
    #[serde(default)]
    pub stone: Decimal,
    /// Ore maintenance per structure.
    #[serde(default)]
    pub ore: Decimal,
}

const fn default_food_rate() -> Decimal {
    dec!(18)
}

const fn default_water_rate() -> Decimal {
    dec!(36)
}

impl Default for ConsumptionRates {
    fn default() -> Self {
        Self {
            food: default_food_rate(),
            water: default_water_rate(),
            wood: Decimal::ZERO,
            stone: Decimal::ZERO,
            ore: Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Level-derived production scalar.
///
/// | Tier | Levels | Multiplier               |
/// |------|--------|--------------------------|
/// | 1    | 1-5    | `0.5 + (level-1) x 0.05` |
/// | 2    | 6-10   | `1.0 + (level-6) x 0.1`  |
/// | 3    | 11-15  | `2.0 + (level-11) x 0.2` |
///
/// Levels outside `1..=15` are clamped.
pub fn tier_multiplier(level: u8) -> Decimal {
    let level = i64::from(level.clamp(1, MAX_LEVEL));
    // Expressed in hundredths.
    let hundredths = match level {
        1..=5 => level.saturating_sub(1).saturating_mul(5).saturating_add(50),
        6..=10 => level.saturating_sub(6).saturating_mul(10).saturating_add(100),
        _ => level.saturating_sub(11).saturating_mul(20).saturating_add(200),
    };
    Decimal::new(hundredths, 2)
}

/// Health-derived production scalar. Missing health counts as full.
pub fn effectiveness(health: Option<u8>) -> Decimal {
    match health {
        None | Some(95..) => Decimal::ONE,
        Some(0) => Decimal::ZERO,
        Some(1..=19) => dec!(0.1),
        Some(20..=39) => dec!(0.5),
        Some(40..=59) => dec!(0.7),
        Some(60..=79) => dec!(0.85),
        Some(80..=94) => dec!(0.95),
    }
}

/// The extractor of `resource` that drives production, if any.
pub fn best_extractor(
    extractors: &[StructureInstance],
    resource: ResourceKind,
) -> Option<&StructureInstance> {
    extractors
        .iter()
        .filter(|s| s.category == StructureCategory::Extractor)
        .filter(|s| blueprint::blueprint(s.structure_type).extracts == Some(resource))
        .max_by_key(|s| (s.level, s.effective_health()))
}

// ---------------------------------------------------------------------------
// Produce / consume
// ---------------------------------------------------------------------------

/// Resources produced on `tile` over `ticks`.
pub fn produce(
    tile: &Tile,
    extractors: &[StructureInstance],
    ticks: u64,
    biome: Biome,
    world_multiplier: Decimal,
) -> ResourceAmounts {
    let ticks = Decimal::from(ticks);
    ResourceAmounts::ZERO.map(|resource, _| {
        let quality = Decimal::from(tile.quality.get(resource))
            .checked_div(HUNDRED)
            .unwrap_or(Decimal::ZERO);
        let scaling = best_extractor(extractors, resource).map_or(Decimal::ONE, |s| {
            tier_multiplier(s.level).saturating_mul(effectiveness(s.health))
        });
        quality
            .saturating_mul(biome::efficiency(biome, resource))
            .saturating_mul(BASE_RATE)
            .saturating_mul(scaling)
            .saturating_mul(ticks)
            .saturating_mul(world_multiplier)
    })
}

/// Resources consumed by `population` over `ticks` at the default rates.
pub fn consume(population: u32, ticks: u64) -> ResourceAmounts {
    consume_with(&ConsumptionRates::default(), population, 0, ticks)
}

/// Resources consumed over `ticks` with explicit rates.
///
/// Food and water scale with `population`, maintenance with
/// `structure_count`.
pub fn consume_with(
    rates: &ConsumptionRates,
    population: u32,
    structure_count: u32,
    ticks: u64,
) -> ResourceAmounts {
    let per_tick = |rate: Decimal, count: u32| {
        Decimal::from(count)
            .saturating_mul(rate)
            .saturating_mul(Decimal::from(ticks))
            .checked_div(Decimal::from(3_600))
            .unwrap_or(Decimal::ZERO)
    };
    ResourceAmounts {
        food: per_tick(rates.food, population),
        water: per_tick(rates.water, population),
        wood: per_tick(rates.wood, structure_count),
        stone: per_tick(rates.stone, structure_count),
        ore: per_tick(rates.ore, structure_count),
    }
}

/// Net change: production minus consumption.
pub fn net(produced: ResourceAmounts, consumed: ResourceAmounts) -> ResourceAmounts {
    produced.saturating_sub(consumed)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use holdfast_types::{RegionId, SettlementId, StructureId, StructureType, TileId, TileQuality};

    use super::*;

    fn tile(food: u32) -> Tile {
        Tile {
            id: TileId::new(),
            region_id: RegionId::new(),
            biome: Biome::Grassland,
            quality: TileQuality {
                food,
                water: 100,
                wood: 100,
                stone: 100,
                ore: 100,
            },
        }
    }

    fn extractor(structure_type: StructureType, level: u8, health: Option<u8>) -> StructureInstance {
        StructureInstance {
            id: StructureId::new(),
            settlement_id: SettlementId::new(),
            category: StructureCategory::Extractor,
            structure_type,
            level,
            health,
            population_assigned: 0,
            built_at: Utc::now(),
        }
    }

    #[test]
    fn tier_multiplier_bands() {
        assert_eq!(tier_multiplier(1), dec!(0.5));
        assert_eq!(tier_multiplier(5), dec!(0.7));
        assert_eq!(tier_multiplier(6), dec!(1.0));
        assert_eq!(tier_multiplier(10), dec!(1.4));
        assert_eq!(tier_multiplier(11), dec!(2.0));
        assert_eq!(tier_multiplier(15), dec!(2.8));
        assert_eq!(tier_multiplier(0), dec!(0.5));
        assert_eq!(tier_multiplier(99), dec!(2.8));
    }

    #[test]
    fn effectiveness_breakpoints() {
        assert_eq!(effectiveness(None), Decimal::ONE);
        assert_eq!(effectiveness(Some(0)), Decimal::ZERO);
        assert_eq!(effectiveness(Some(1)), dec!(0.1));
        assert_eq!(effectiveness(Some(19)), dec!(0.1));
        assert_eq!(effectiveness(Some(20)), dec!(0.5));
        assert_eq!(effectiveness(Some(40)), dec!(0.7));
        assert_eq!(effectiveness(Some(60)), dec!(0.85));
        assert_eq!(effectiveness(Some(80)), dec!(0.95));
        assert_eq!(effectiveness(Some(94)), dec!(0.95));
        assert_eq!(effectiveness(Some(95)), Decimal::ONE);
        assert_eq!(effectiveness(Some(100)), Decimal::ONE);
    }

    #[test]
    fn effectiveness_is_monotonic() {
        let mut previous = Decimal::ZERO;
        for health in 0..=100_u8 {
            let value = effectiveness(Some(health));
            assert!(value >= previous, "health {health} decreased effectiveness");
            previous = value;
        }
    }

    #[test]
    fn level_one_farm_for_one_second() {
        let farm = extractor(StructureType::Farm, 1, Some(100));
        let out = produce(&tile(100), &[farm], 60, Biome::Grassland, Decimal::ONE);
        assert_eq!(out.food, dec!(6.0));
    }

    #[test]
    fn ambient_gathering_without_extractor() {
        let out = produce(&tile(100), &[], 60, Biome::Grassland, Decimal::ONE);
        // 1.0 x 1.0 x 0.2 x 60
        assert_eq!(out.food, dec!(12));
        // 1.0 x 0.3 x 0.2 x 60
        assert_eq!(out.ore, dec!(3.6));
    }

    #[test]
    fn highest_level_extractor_wins() {
        let low = extractor(StructureType::Farm, 1, Some(100));
        let high = extractor(StructureType::Farm, 6, Some(50));
        let survivors = [low, high.clone()];
        let chosen = best_extractor(&survivors, ResourceKind::Food);
        assert_eq!(chosen.map(|s| s.id), Some(high.id));
    }

    #[test]
    fn equal_levels_prefer_healthier() {
        let hurt = extractor(StructureType::Well, 3, Some(30));
        let healthy = extractor(StructureType::Well, 3, None);
        let survivors = [hurt, healthy.clone()];
        let chosen = best_extractor(&survivors, ResourceKind::Water);
        assert_eq!(chosen.map(|s| s.id), Some(healthy.id));
    }

    #[test]
    fn world_multiplier_scales_output() {
        let farm = extractor(StructureType::Farm, 1, None);
        let out = produce(&tile(100), &[farm], 60, Biome::Grassland, dec!(2));
        assert_eq!(out.food, dec!(12));
    }

    #[test]
    fn consumption_per_settler() {
        let used = consume(100, 3_600);
        assert_eq!(used.food, dec!(1800));
        assert_eq!(used.water, dec!(3600));
        assert_eq!(used.wood, Decimal::ZERO);
        assert_eq!(used.stone, Decimal::ZERO);
        assert_eq!(used.ore, Decimal::ZERO);
    }

    #[test]
    fn maintenance_rates_are_configurable() {
        let rates = ConsumptionRates {
            wood: dec!(3.6),
            ..ConsumptionRates::default()
        };
        let used = consume_with(&rates, 0, 10, 1_000);
        assert_eq!(used.wood, dec!(10));
        assert_eq!(used.food, Decimal::ZERO);
    }

    #[test]
    fn net_subtracts_consumption() {
        let out = net(ResourceAmounts::uniform(dec!(10)), consume(100, 60));
        assert_eq!(out.food, dec!(-20));
        assert_eq!(out.stone, dec!(10));
    }
}
