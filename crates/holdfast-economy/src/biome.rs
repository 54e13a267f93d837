//! Biome tables: extraction efficiency per resource and disaster
//! vulnerability.
//!
//! | Biome     | Food | Water | Wood | Stone | Ore | Vulnerability |
//! |-----------|------|-------|------|-------|-----|---------------|
//! | Grassland | 1.0  | 0.8   | 0.6  | 0.5   | 0.3 | 0.9           |
//! | Forest    | 0.7  | 0.8   | 1.2  | 0.5   | 0.4 | 1.0           |
//! | Mountain  | 0.4  | 0.6   | 0.6  | 1.2   | 1.3 | 1.0           |
//! | Desert    | 0.3  | 0.2   | 0.2  | 0.9   | 0.8 | 1.1           |
//! | Tundra    | 0.4  | 0.7   | 0.5  | 0.8   | 0.9 | 1.1           |
//! | Swamp     | 0.6  | 1.1   | 0.9  | 0.3   | 0.4 | 1.05          |
//! | Coastal   | 0.9  | 1.0   | 0.6  | 0.6   | 0.4 | 1.1           |

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use holdfast_types::{Biome, ResourceKind};

/// Extraction efficiency of `resource` on a tile of `biome`, in tenths.
const fn efficiency_tenths(biome: Biome, resource: ResourceKind) -> u32 {
    // [food, water, wood, stone, ore]
    let row: [u32; 5] = match biome {
        Biome::Grassland => [10, 8, 6, 5, 3],
        Biome::Forest => [7, 8, 12, 5, 4],
        Biome::Mountain => [4, 6, 6, 12, 13],
        Biome::Desert => [3, 2, 2, 9, 8],
        Biome::Tundra => [4, 7, 5, 8, 9],
        Biome::Swamp => [6, 11, 9, 3, 4],
        Biome::Coastal => [9, 10, 6, 6, 4],
    };
    let [food, water, wood, stone, ore] = row;
    match resource {
        ResourceKind::Food => food,
        ResourceKind::Water => water,
        ResourceKind::Wood => wood,
        ResourceKind::Stone => stone,
        ResourceKind::Ore => ore,
    }
}

/// Extraction efficiency multiplier of `resource` on `biome`.
pub const fn efficiency(biome: Biome, resource: ResourceKind) -> Decimal {
    Decimal::from_parts(efficiency_tenths(biome, resource), 0, 0, false, 1)
}

/// Disaster severity multiplier for settlements on `biome`.
pub const fn vulnerability(biome: Biome) -> Decimal {
    match biome {
        Biome::Grassland => dec!(0.9),
        Biome::Forest | Biome::Mountain => Decimal::ONE,
        Biome::Swamp => dec!(1.05),
        Biome::Desert | Biome::Tundra | Biome::Coastal => dec!(1.1),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn grassland_favours_food() {
        assert_eq!(efficiency(Biome::Grassland, ResourceKind::Food), dec!(1.0));
        assert_eq!(efficiency(Biome::Grassland, ResourceKind::Ore), dec!(0.3));
    }

    #[test]
    fn mountain_favours_ore_and_stone() {
        assert_eq!(efficiency(Biome::Mountain, ResourceKind::Ore), dec!(1.3));
        assert_eq!(efficiency(Biome::Mountain, ResourceKind::Stone), dec!(1.2));
    }

    #[test]
    fn vulnerability_table() {
        assert_eq!(vulnerability(Biome::Grassland), dec!(0.9));
        assert_eq!(vulnerability(Biome::Swamp), dec!(1.05));
        assert_eq!(vulnerability(Biome::Coastal), dec!(1.1));
    }
}
