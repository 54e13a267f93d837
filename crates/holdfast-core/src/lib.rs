//! Tick scheduler and cadence passes for the Holdfast simulation.
//!
//! This crate turns the pure rules in `holdfast-economy` and
//! `holdfast-disasters` into a running simulation: it fires cadences on a
//! fixed tick, loads state through [`SimulationStore`], applies the rules,
//! writes the results back, and broadcasts events through
//! [`EventPublisher`].
//!
//! # Modules
//!
//! - [`cadence`] -- Cadences and their tick intervals.
//! - [`clock`] -- Injected wall clock ([`SystemClock`], [`ManualClock`]).
//! - [`config`] -- Loading `holdfast-config.yaml` with environment
//!   overrides.
//! - [`engine`] -- Per-world and per-settlement dispatch of fired cadences.
//! - [`error`] -- Engine, store, and publish errors.
//! - [`memory`] -- In-memory store for tests and local runs.
//! - [`publish`] -- Publisher seam and the tokio broadcast implementation.
//! - [`scheduler`] -- The tick driver.
//! - [`store`] -- Persistence seam.

pub mod cadence;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
mod passes;
pub mod publish;
pub mod scheduler;
pub mod store;

pub use cadence::{Cadence, CadenceTracker};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, PublishError, StoreError};
pub use memory::MemoryStore;
pub use publish::{BroadcastPublisher, EventPublisher, PublishOutcome};
pub use scheduler::{Scheduler, SchedulerStatus};
pub use store::{EnqueueOutcome, SimulationStore};
