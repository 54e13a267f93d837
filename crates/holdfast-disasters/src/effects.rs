//! Production modifiers of active disasters.
//!
//! During impact a disaster multiplies production by its impact table.
//! During aftermath the penalty decays linearly back to 1.0:
//!
//! ```text
//! intensity = clamp(1 - elapsed / aftermath, 0, 1)
//! modifier  = 1 - (1 - impact) x intensity
//! ```
//!
//! Scheduled and warning disasters have no effect. A disaster only touches
//! settlements in its own region on a biome it affects. Several disasters
//! over the same settlement combine multiplicatively.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use holdfast_types::{Biome, DisasterEvent, DisasterPhase, RegionId, ResourceAmounts};

use crate::catalog;

/// Remaining strength of an aftermath penalty, in `[0, 1]`.
pub fn aftermath_intensity(
    impact_ended_at: DateTime<Utc>,
    now: DateTime<Utc>,
    aftermath: TimeDelta,
) -> Decimal {
    let total = aftermath.num_milliseconds();
    if total <= 0 {
        return Decimal::ZERO;
    }
    let elapsed = now
        .signed_duration_since(impact_ended_at)
        .num_milliseconds()
        .max(0);
    let faded = Decimal::from(elapsed)
        .checked_div(Decimal::from(total))
        .unwrap_or(Decimal::ONE);
    Decimal::ONE
        .saturating_sub(faded)
        .clamp(Decimal::ZERO, Decimal::ONE)
}

/// Production multipliers of one disaster at `now`.
pub fn disaster_modifier(
    disaster: &DisasterEvent,
    now: DateTime<Utc>,
    aftermath: TimeDelta,
) -> ResourceAmounts {
    let impact = catalog::profile(disaster.disaster_type).impact;
    match disaster.phase {
        DisasterPhase::Impact { .. } => impact,
        DisasterPhase::Aftermath { impact_ended_at } => {
            let intensity = aftermath_intensity(impact_ended_at, now, aftermath);
            impact.map(|_, full| {
                Decimal::ONE.saturating_sub(Decimal::ONE.saturating_sub(full).saturating_mul(intensity))
            })
        }
        DisasterPhase::Scheduled | DisasterPhase::Warning { .. } | DisasterPhase::Resolved { .. } => {
            ResourceAmounts::ONE
        }
    }
}

/// Combined multipliers of every disaster over a settlement in `region_id`
/// on a tile of `biome`.
pub fn combined_modifiers(
    disasters: &[DisasterEvent],
    region_id: RegionId,
    biome: Biome,
    now: DateTime<Utc>,
    aftermath: TimeDelta,
) -> ResourceAmounts {
    disasters
        .iter()
        .filter(|d| d.region_id == region_id && d.affects(biome))
        .fold(ResourceAmounts::ONE, |acc, d| {
            acc.saturating_mul(disaster_modifier(d, now, aftermath))
        })
}
