//! Static disaster tables.
//!
//! | Type       | Warning | Impact | Production impact                  | Damage factor |
//! |------------|---------|--------|------------------------------------|---------------|
//! | Drought    | 48h     | 72h    | food 0.5, water 0.7                | 0.1           |
//! | Wildfire   | 6h      | 12h    | food 0.8, wood 0.5                 | 0.5           |
//! | Flood      | 12h     | 24h    | food 0.6, stone 0.9                | 0.4           |
//! | Blizzard   | 24h     | 36h    | food 0.6, water 0.8, wood 0.7      | 0.3           |
//! | Earthquake | 30m     | 1h     | stone 0.7, ore 0.6                 | 0.6           |
//! | Landslide  | 1h      | 2h     | stone 0.6, ore 0.8                 | 0.5           |
//! | Sandstorm  | 6h      | 12h    | food 0.7, water 0.6                | 0.2           |
//! | Locusts    | 24h     | 48h    | food 0.4                           | 0.0           |
//! | Hurricane  | 36h     | 24h    | food 0.6, wood 0.6, water 0.9      | 0.5           |

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use holdfast_types::{Biome, DisasterType, FrequencyTier, ResourceAmounts, ResourceKind, SeverityLevel};

/// Static description of a disaster type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisasterProfile {
    /// Lead time between the warning and impact, before template scaling.
    pub warning_seconds: u32,
    /// Duration of the impact phase.
    pub impact_seconds: u32,
    /// Production multipliers during impact. One where unaffected.
    pub impact: ResourceAmounts,
    /// Fraction of severity dealt as structure damage.
    pub damage_factor: Decimal,
}

/// Biome risk lists, drawn from with 60/30/10 weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskProfile {
    /// Most likely disasters.
    pub high: &'static [DisasterType],
    /// Occasional disasters.
    pub moderate: &'static [DisasterType],
    /// Rare disasters.
    pub low: &'static [DisasterType],
}

const HOUR: u32 = 3_600;

/// Impact multipliers in tenths: `[food, water, wood, stone, ore]`.
const fn impact(tenths: [u32; 5]) -> ResourceAmounts {
    let [food, water, wood, stone, ore] = tenths;
    ResourceAmounts {
        food: Decimal::from_parts(food, 0, 0, false, 1),
        water: Decimal::from_parts(water, 0, 0, false, 1),
        wood: Decimal::from_parts(wood, 0, 0, false, 1),
        stone: Decimal::from_parts(stone, 0, 0, false, 1),
        ore: Decimal::from_parts(ore, 0, 0, false, 1),
    }
}

/// Return the profile of a disaster type.
pub const fn profile(disaster_type: DisasterType) -> DisasterProfile {
    match disaster_type {
        DisasterType::Drought => DisasterProfile {
            warning_seconds: 172_800,
            impact_seconds: 259_200,
            impact: impact([5, 7, 10, 10, 10]),
            damage_factor: dec!(0.1),
        },
        DisasterType::Wildfire => DisasterProfile {
            warning_seconds: 21_600,
            impact_seconds: 43_200,
            impact: impact([8, 10, 5, 10, 10]),
            damage_factor: dec!(0.5),
        },
        DisasterType::Flood => DisasterProfile {
            warning_seconds: 43_200,
            impact_seconds: 86_400,
            impact: impact([6, 10, 10, 9, 10]),
            damage_factor: dec!(0.4),
        },
        DisasterType::Blizzard => DisasterProfile {
            warning_seconds: 86_400,
            impact_seconds: 129_600,
            impact: impact([6, 8, 7, 10, 10]),
            damage_factor: dec!(0.3),
        },
        DisasterType::Earthquake => DisasterProfile {
            warning_seconds: 1_800,
            impact_seconds: HOUR,
            impact: impact([10, 10, 10, 7, 6]),
            damage_factor: dec!(0.6),
        },
        DisasterType::Landslide => DisasterProfile {
            warning_seconds: HOUR,
            impact_seconds: 7_200,
            impact: impact([10, 10, 10, 6, 8]),
            damage_factor: dec!(0.5),
        },
        DisasterType::Sandstorm => DisasterProfile {
            warning_seconds: 21_600,
            impact_seconds: 43_200,
            impact: impact([7, 6, 10, 10, 10]),
            damage_factor: dec!(0.2),
        },
        DisasterType::Locusts => DisasterProfile {
            warning_seconds: 86_400,
            impact_seconds: 172_800,
            impact: impact([4, 10, 10, 10, 10]),
            damage_factor: Decimal::ZERO,
        },
        DisasterType::Hurricane => DisasterProfile {
            warning_seconds: 129_600,
            impact_seconds: 86_400,
            impact: impact([6, 9, 6, 10, 10]),
            damage_factor: dec!(0.5),
        },
    }
}

/// Resources whose production a disaster type reduces.
pub fn affected_resources(disaster_type: DisasterType) -> Vec<ResourceKind> {
    profile(disaster_type)
        .impact
        .iter()
        .filter(|&(_, multiplier)| multiplier < Decimal::ONE)
        .map(|(resource, _)| resource)
        .collect()
}

/// Disaster risk lists of a biome.
pub const fn risk(biome: Biome) -> RiskProfile {
    use DisasterType as D;
    match biome {
        Biome::Grassland => RiskProfile {
            high: &[D::Drought, D::Locusts],
            moderate: &[D::Wildfire, D::Flood],
            low: &[D::Earthquake],
        },
        Biome::Forest => RiskProfile {
            high: &[D::Wildfire],
            moderate: &[D::Drought, D::Blizzard],
            low: &[D::Landslide],
        },
        Biome::Mountain => RiskProfile {
            high: &[D::Landslide, D::Earthquake],
            moderate: &[D::Blizzard],
            low: &[D::Wildfire],
        },
        Biome::Desert => RiskProfile {
            high: &[D::Sandstorm, D::Drought],
            moderate: &[D::Locusts],
            low: &[D::Flood],
        },
        Biome::Tundra => RiskProfile {
            high: &[D::Blizzard],
            moderate: &[D::Earthquake],
            low: &[D::Flood],
        },
        Biome::Swamp => RiskProfile {
            high: &[D::Flood],
            moderate: &[D::Locusts],
            low: &[D::Wildfire],
        },
        Biome::Coastal => RiskProfile {
            high: &[D::Hurricane, D::Flood],
            moderate: &[D::Earthquake],
            low: &[D::Drought],
        },
    }
}

/// Chance per region per hour of a disaster starting.
pub const fn frequency_chance(tier: FrequencyTier) -> f64 {
    match tier {
        FrequencyTier::Rare => 0.005,
        FrequencyTier::Normal => 0.015,
        FrequencyTier::Frequent => 0.04,
        FrequencyTier::Extreme => 0.08,
    }
}

/// Share of the population lost when impact ends.
pub const fn casualty_share(level: SeverityLevel) -> Decimal {
    match level {
        SeverityLevel::Mild => dec!(0.01),
        SeverityLevel::Moderate => dec!(0.03),
        SeverityLevel::Major => dec!(0.07),
        SeverityLevel::Catastrophic => dec!(0.15),
    }
}

/// Share of affected stock destroyed when impact ends.
pub const fn loss_share(level: SeverityLevel) -> Decimal {
    match level {
        SeverityLevel::Mild => dec!(0.05),
        SeverityLevel::Moderate => dec!(0.10),
        SeverityLevel::Major => dec!(0.20),
        SeverityLevel::Catastrophic => dec!(0.35),
    }
}

/// Resilience granted to each affected settlement on resolution.
pub const fn resilience_bonus(level: SeverityLevel) -> u32 {
    match level {
        SeverityLevel::Mild => 2,
        SeverityLevel::Moderate => 5,
        SeverityLevel::Major => 10,
        SeverityLevel::Catastrophic => 15,
    }
}
