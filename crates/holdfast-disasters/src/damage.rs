//! Incremental structure damage and end-of-impact losses.
//!
//! A disaster deals `round(severity x damage_factor)` health to every
//! structure of an affected settlement, split over
//! `N = ceil(impact / sub_interval)` increments. Increment `k` deals
//! `floor(total x k / N) - floor(total x (k - 1) / N)`, so the increments
//! always sum to exactly `total` no matter how they are batched.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use holdfast_types::{DisasterType, ResourceAmounts, SeverityLevel};

use crate::catalog;

/// Total damage each structure takes over the whole impact, at most 100.
pub fn total_damage(severity: u8, disaster_type: DisasterType) -> u8 {
    Decimal::from(severity)
        .saturating_mul(catalog::profile(disaster_type).damage_factor)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .min(Decimal::ONE_HUNDRED)
        .to_u8()
        .unwrap_or(0)
}

/// Number of damage increments for an impact of `impact_seconds`.
///
/// Always at least one.
pub fn total_increments(impact_seconds: u32, interval_seconds: u32) -> u32 {
    let interval = interval_seconds.max(1);
    impact_seconds.div_ceil(interval).max(1)
}

/// Cumulative damage after `k` of `n` increments.
fn cumulative(total: u8, k: u32, n: u32) -> u32 {
    let k = k.min(n);
    u32::from(total)
        .saturating_mul(k)
        .checked_div(n)
        .unwrap_or(0)
}

/// Damage dealt by increments `from + 1 ..= to` of `n`.
pub fn damage_between(total: u8, from: u32, to: u32, n: u32) -> u8 {
    let dealt = cumulative(total, to, n).saturating_sub(cumulative(total, from, n));
    u8::try_from(dealt).unwrap_or(u8::MAX)
}

/// Damage dealt by increment `k` (1-based) of `n`.
pub fn increment_damage(total: u8, k: u32, n: u32) -> u8 {
    damage_between(total, k.saturating_sub(1), k, n)
}

/// Health after taking `damage`, floored at 0. Missing health counts as full.
pub fn apply_damage(health: Option<u8>, damage: u8) -> u8 {
    health.unwrap_or(100).min(100).saturating_sub(damage)
}

/// Settlers lost when impact ends. At least one settler always survives.
pub fn casualties(population: u32, level: SeverityLevel) -> u32 {
    let lost = Decimal::from(population)
        .saturating_mul(catalog::casualty_share(level))
        .floor()
        .to_u32()
        .unwrap_or(0);
    lost.min(population.saturating_sub(1))
}

/// Stock destroyed when impact ends, limited to the type's affected
/// resources.
pub fn resource_losses(
    stock: ResourceAmounts,
    disaster_type: DisasterType,
    level: SeverityLevel,
) -> ResourceAmounts {
    let affected = catalog::affected_resources(disaster_type);
    let share = catalog::loss_share(level);
    stock.map(|resource, amount| {
        if affected.contains(&resource) {
            amount.max(Decimal::ZERO).saturating_mul(share)
        } else {
            Decimal::ZERO
        }
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn total_damage_rounds_severity_times_factor() {
        assert_eq!(total_damage(80, DisasterType::Earthquake), 48);
        assert_eq!(total_damage(55, DisasterType::Flood), 22);
        assert_eq!(total_damage(100, DisasterType::Locusts), 0);
        // 0.1 x 45 = 4.5, halves round up
        assert_eq!(total_damage(45, DisasterType::Drought), 5);
    }

    #[test]
    fn increments_cover_the_impact() {
        assert_eq!(total_increments(3_600, 600), 6);
        assert_eq!(total_increments(3_700, 600), 7);
        assert_eq!(total_increments(100, 600), 1);
        assert_eq!(total_increments(0, 600), 1);
    }

    #[test]
    fn increments_sum_to_total() {
        for total in [0_u8, 1, 7, 48, 100] {
            for n in [1_u32, 3, 6, 7, 432] {
                let sum: u32 = (1..=n)
                    .map(|k| u32::from(increment_damage(total, k, n)))
                    .sum();
                assert_eq!(sum, u32::from(total), "total {total} over {n} increments");
            }
        }
    }

    #[test]
    fn batched_increments_match_single_steps() {
        let batched = damage_between(48, 0, 4, 6);
        let single: u8 = (1..=4).map(|k| increment_damage(48, k, 6)).sum();
        assert_eq!(batched, single);
        assert_eq!(damage_between(48, 0, 6, 6), 48);
    }

    #[test]
    fn health_floors_at_zero() {
        assert_eq!(apply_damage(Some(10), 30), 0);
        assert_eq!(apply_damage(None, 30), 70);
    }

    #[test]
    fn casualties_never_empty_a_settlement() {
        assert_eq!(casualties(100, SeverityLevel::Catastrophic), 15);
        assert_eq!(casualties(100, SeverityLevel::Mild), 1);
        assert_eq!(casualties(1, SeverityLevel::Catastrophic), 0);
        assert_eq!(casualties(50, SeverityLevel::Mild), 0);
    }

    #[test]
    fn losses_only_touch_affected_resources() {
        let stock = ResourceAmounts::uniform(dec!(200));
        let lost = resource_losses(stock, DisasterType::Drought, SeverityLevel::Major);
        assert_eq!(lost.food, dec!(40));
        assert_eq!(lost.water, dec!(40));
        assert_eq!(lost.wood, Decimal::ZERO);
        assert_eq!(lost.ore, Decimal::ZERO);
    }
}
