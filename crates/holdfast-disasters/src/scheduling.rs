//! Hourly disaster creation rolls.
//!
//! Each active world rolls once per region per hour. On success the roll
//! samples a biome from the region's tiles (weighted by tile count), draws a
//! disaster type from the biome's risk lists with 60/30/10 weights, and rolls
//! a severity scaled by the world template and the biome's vulnerability.
//!
//! All functions take the random source as a parameter so tests can seed it.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use holdfast_economy::biome;
use holdfast_types::{Biome, DisasterEvent, DisasterId, DisasterPhase, DisasterType, Region, World};

use crate::catalog;
use crate::error::DisasterError;

/// Longest random delay before the warning period starts.
pub const MAX_LEAD_SECONDS: u32 = 21_600;

/// Sample a biome with probability proportional to its tile count.
///
/// Returns `None` when the region has no tiles.
pub fn sample_biome<R: Rng + ?Sized>(rng: &mut R, biome_tiles: &BTreeMap<Biome, u32>) -> Option<Biome> {
    let total: u32 = biome_tiles.values().fold(0, |acc, &n| acc.saturating_add(n));
    if total == 0 {
        return None;
    }
    let pick = rng.random_range(0..total);
    let mut cumulative: u32 = 0;
    for (&biome, &count) in biome_tiles {
        cumulative = cumulative.saturating_add(count);
        if pick < cumulative {
            return Some(biome);
        }
    }
    None
}

/// Draw a disaster type from the biome's risk lists.
pub fn sample_type<R: Rng + ?Sized>(rng: &mut R, biome: Biome) -> DisasterType {
    let risks = catalog::risk(biome);
    let roll: u32 = rng.random_range(0..100);
    let list = match roll {
        0..60 => risks.high,
        60..90 => risks.moderate,
        _ => risks.low,
    };
    let index = rng.random_range(0..list.len().max(1));
    list.get(index)
        .or_else(|| risks.high.first())
        .copied()
        .unwrap_or(DisasterType::Drought)
}

/// Roll a severity in `[0, 100]`.
///
/// `round((20 + rand x 60) x severity_multiplier x vulnerability(biome))`.
pub fn roll_severity<R: Rng + ?Sized>(rng: &mut R, severity_multiplier: Decimal, biome: Biome) -> u8 {
    let spread = Decimal::from_f64(rng.random::<f64>()).unwrap_or(Decimal::ZERO);
    Decimal::from(20)
        .saturating_add(spread.saturating_mul(Decimal::from(60)))
        .saturating_mul(severity_multiplier)
        .saturating_mul(biome::vulnerability(biome))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
        .to_u8()
        .unwrap_or(0)
}

/// Warning lead time of a type after template scaling.
pub fn scaled_warning_seconds(disaster_type: DisasterType, warning_time_multiplier: Decimal) -> u32 {
    Decimal::from(catalog::profile(disaster_type).warning_seconds)
        .saturating_mul(warning_time_multiplier.max(Decimal::ZERO))
        .round()
        .to_u32()
        .unwrap_or(u32::MAX)
}

/// Roll for a new disaster in one region of `world`.
///
/// Returns `Ok(None)` when the roll fails. A region without tiles never
/// produces a disaster.
pub fn roll_for_region<R: Rng + ?Sized>(
    rng: &mut R,
    world: &World,
    region: &Region,
    now: DateTime<Utc>,
) -> Result<Option<DisasterEvent>, DisasterError> {
    let chance = catalog::frequency_chance(world.template.disaster_frequency);
    if !rng.random_bool(chance) {
        return Ok(None);
    }
    let biome = sample_biome(rng, &region.biome_tiles).ok_or(DisasterError::EmptyRegion(region.id))?;
    let disaster_type = sample_type(rng, biome);
    let severity = roll_severity(rng, world.template.severity_multiplier, biome);
    let warning_seconds = scaled_warning_seconds(disaster_type, world.template.warning_time_multiplier);
    let lead_seconds = rng.random_range(0..=MAX_LEAD_SECONDS);

    let id = DisasterId::new();
    let offset = TimeDelta::seconds(i64::from(lead_seconds).saturating_add(i64::from(warning_seconds)));
    let scheduled_at = now
        .checked_add_signed(offset)
        .ok_or(DisasterError::TimeOutOfRange(id))?;

    Ok(Some(DisasterEvent {
        id,
        world_id: world.id,
        disaster_type,
        severity,
        region_id: region.id,
        affected_biomes: vec![biome],
        scheduled_at,
        warning_seconds,
        impact_seconds: catalog::profile(disaster_type).impact_seconds,
        phase: DisasterPhase::Scheduled,
        created_at: now,
    }))
}
