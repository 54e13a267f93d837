//! Settlement economy rules for the Holdfast simulation.
//!
//! Pure functions over settlement state. Nothing in this crate touches
//! storage or the clock; callers pass in the state and the current time and
//! persist what comes back.
//!
//! # Modules
//!
//! - [`biome`] -- Extraction efficiency and disaster vulnerability tables.
//! - [`blueprint`] -- Structure catalogue: build times, costs, and modifier
//!   contributions.
//! - [`construction`] -- Queue validation, slot allocation, and completion.
//! - [`error`] -- Validation errors.
//! - [`modifiers`] -- Modifier aggregation and the legacy alias table.
//! - [`population`] -- Capacity, happiness, growth, and migration.
//! - [`production`] -- Per-tick production and consumption.
//! - [`repair`] -- Passive Workshop repair.
//! - [`storage`] -- Capacity, clamping, waste, and warnings.

pub mod biome;
pub mod blueprint;
pub mod construction;
pub mod error;
pub mod modifiers;
pub mod population;
pub mod production;
pub mod repair;
pub mod storage;

pub use blueprint::{Blueprint, MAX_LEVEL, blueprint};
pub use construction::{BuildRequest, EnqueuePlan, MAX_CONCURRENT_BUILDS, QueueStep};
pub use error::EconomyError;
pub use modifiers::ModifierTotals;
pub use population::{Migration, Sufficiency};
pub use production::ConsumptionRates;
pub use repair::Repair;
