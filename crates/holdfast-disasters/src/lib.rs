//! Disaster system for the Holdfast simulation.
//!
//! Disasters are rolled hourly per region, announced with a warning, deal
//! incremental structure damage during impact, depress production through a
//! decaying aftermath, and finally resolve with a resilience reward.
//!
//! Everything here is pure. The engine loads disasters and settlement state,
//! calls into these modules with the current time, and persists the result.
//!
//! # Modules
//!
//! - [`catalog`] -- Per-type timing, impact, and damage tables; biome risks.
//! - [`damage`] -- Incremental damage, casualties, and resource losses.
//! - [`effects`] -- Production modifiers during impact and aftermath.
//! - [`error`] -- Disaster errors.
//! - [`lifecycle`] -- The phase state machine.
//! - [`scheduling`] -- Hourly creation rolls.

pub mod catalog;
pub mod damage;
pub mod effects;
pub mod error;
pub mod lifecycle;
pub mod scheduling;

pub use catalog::{DisasterProfile, RiskProfile};
pub use error::DisasterError;
pub use lifecycle::{Advance, LifecycleConfig, Transition};
