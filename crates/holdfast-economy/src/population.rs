//! Population dynamics: capacity, happiness, growth, and migration.
//!
//! Growth is proportional to elapsed wall-clock time, so a settlement that
//! was not evaluated for a day grows (or shrinks) by a day's worth on its
//! next pass. Fractions of a settler are carried between passes.
//!
//! Migration is stochastic and sampled once per pass:
//!
//! - immigration: 0% below happiness 50, then 2% at 50 rising linearly to
//!   15% at 100; 1-3 settlers, only while below capacity
//! - emigration: 0% at or above happiness 35, then rising linearly to 25%
//!   at 0; 1-3 settlers, never the last one

use std::time::Duration;

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use holdfast_types::{ModifierKind, ResourceAmounts};

use crate::modifiers::ModifierTotals;

/// Population capacity before modifiers.
pub const BASE_CAPACITY: i64 = 10;

/// Happiness before modifiers.
pub const BASE_HAPPINESS: i64 = 50;

/// Hourly growth rate at happiness 50 with sufficient resources.
pub const GROWTH_RATE_PER_HOUR: f64 = 0.05;

/// Hourly decline rate when food or water is insufficient.
pub const DECLINE_RATE_PER_HOUR: f64 = 0.05;

/// Happiness at which immigration becomes possible.
pub const IMMIGRATION_THRESHOLD: u8 = 50;

/// Happiness below which emigration becomes possible.
pub const EMIGRATION_THRESHOLD: u8 = 35;

const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Whether stock covers the population's needs over the pass window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sufficiency {
    /// Food stock covers consumption.
    pub food: bool,
    /// Water stock covers consumption.
    pub water: bool,
}

impl Sufficiency {
    /// Compare `stock` against what the population consumes over the
    /// window (`needed`).
    ///
    /// A resource is covered when some is on hand and the stock meets the
    /// window's consumption.
    pub fn over_window(stock: ResourceAmounts, needed: ResourceAmounts) -> Self {
        let covers = |have: Decimal, need: Decimal| have > Decimal::ZERO && have >= need;
        Self {
            food: covers(stock.food, needed.food),
            water: covers(stock.water, needed.water),
        }
    }

    /// Both food and water are covered.
    pub const fn is_sufficient(self) -> bool {
        self.food && self.water
    }
}

/// Result of natural growth over one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthStep {
    /// Population after growth, within `[1, max(capacity, 1)]`.
    pub population: u32,
    /// Fractional growth carried to the next pass.
    pub carry: f64,
}

/// Settlers arriving and leaving in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Migration {
    /// New settlers.
    pub immigrants: u32,
    /// Departing settlers.
    pub emigrants: u32,
}

// ---------------------------------------------------------------------------
// Capacity and happiness
// ---------------------------------------------------------------------------

/// Population cap: base 10 plus population-capacity modifiers, floored at 0.
pub fn capacity(modifiers: &ModifierTotals) -> u32 {
    let total = Decimal::from(BASE_CAPACITY)
        .saturating_add(modifiers.get(ModifierKind::PopulationCapacity))
        .floor();
    total.to_u32().unwrap_or(if total.is_sign_negative() { 0 } else { u32::MAX })
}

/// Happiness: base 50 plus morale modifiers, clamped to `[0, 100]`.
pub fn happiness(modifiers: &ModifierTotals) -> u8 {
    let total = Decimal::from(BASE_HAPPINESS)
        .saturating_add(modifiers.get(ModifierKind::MoraleBonus))
        .round()
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    total.to_u8().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Growth
// ---------------------------------------------------------------------------

/// Natural growth or decline over `elapsed_ms`.
///
/// With sufficient resources the population grows toward `capacity` at
/// `5%/h x happiness/50`; otherwise it declines at 5%/h. The whole part of
/// the change is applied and the remainder carried.
pub fn step(
    current: u32,
    capacity: u32,
    happiness: u8,
    sufficiency: Sufficiency,
    elapsed_ms: u64,
    carry: f64,
) -> GrowthStep {
    let ceiling = capacity.max(1);
    let hours = Duration::from_millis(elapsed_ms).as_secs_f64() / SECONDS_PER_HOUR;
    let population = f64::from(current);

    let change = if sufficiency.is_sufficient() {
        if current >= capacity {
            return GrowthStep {
                population: current.clamp(1, ceiling),
                carry: 0.0,
            };
        }
        let rate = GROWTH_RATE_PER_HOUR * f64::from(happiness) / 50.0;
        (population * rate * hours).min(f64::from(capacity.saturating_sub(current)))
    } else {
        -(population * DECLINE_RATE_PER_HOUR * hours)
    };

    let total = change + carry;
    let whole = total.trunc();
    let carry = total - whole;

    // Bounded by `capacity` above and `-current` below, both within i64.
    #[allow(clippy::cast_possible_truncation)]
    let whole = whole as i64;
    let next = i64::from(current).saturating_add(whole);
    let clamped = next.clamp(1, i64::from(ceiling));

    GrowthStep {
        population: u32::try_from(clamped).unwrap_or(1),
        carry,
    }
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// Chance of immigrants arriving in one pass.
pub fn immigration_chance(happiness: u8) -> f64 {
    if happiness < IMMIGRATION_THRESHOLD {
        return 0.0;
    }
    let above = f64::from(happiness.min(100).saturating_sub(IMMIGRATION_THRESHOLD));
    0.02 + above / 50.0 * 0.13
}

/// Chance of settlers leaving in one pass.
pub fn emigration_chance(happiness: u8) -> f64 {
    if happiness >= EMIGRATION_THRESHOLD {
        return 0.0;
    }
    let below = f64::from(EMIGRATION_THRESHOLD.saturating_sub(happiness));
    0.25 * below / f64::from(EMIGRATION_THRESHOLD)
}

/// Sample this pass's migration.
pub fn sample_migration(
    rng: &mut impl Rng,
    population: u32,
    capacity: u32,
    happiness: u8,
) -> Migration {
    let mut migration = Migration::default();

    if population < capacity && rng.random::<f64>() < immigration_chance(happiness) {
        let batch: u32 = rng.random_range(1..=3);
        migration.immigrants = batch.min(capacity.saturating_sub(population));
    }

    if population > 1 && rng.random::<f64>() < emigration_chance(happiness) {
        let batch: u32 = rng.random_range(1..=3);
        migration.emigrants = batch.min(population.saturating_sub(1));
    }

    migration
}

/// Final population after migration, within `[1, max(capacity, 1)]`.
pub fn finalize(population: u32, migration: Migration, capacity: u32) -> u32 {
    population
        .saturating_add(migration.immigrants)
        .saturating_sub(migration.emigrants)
        .clamp(1, capacity.max(1))
}
