//! `PostgreSQL` persistence for the Holdfast simulation.
//!
//! [`PgSimulationStore`] implements the engine's
//! [`SimulationStore`](holdfast_core::SimulationStore) seam. Each table group
//! has its own borrowed store type; operations that touch several rows
//! (enqueueing a build, completing one, delivering a transfer, replacing
//! modifier aggregates) run inside a single transaction.
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, configuration, and migrations
//! - [`world_store`] -- Worlds, regions, tiles, and settlements
//! - [`settlement_store`] -- Structures, modifiers, stock, population, and
//!   the construction queue
//! - [`disaster_store`] -- Disasters and their reports
//! - [`transfer_store`] -- Resource transfers and cadence claim markers
//! - [`store`] -- The [`SimulationStore`](holdfast_core::SimulationStore)
//!   implementation
//! - [`error`] -- Shared error types

mod convert;
pub mod disaster_store;
pub mod error;
pub mod postgres;
pub mod settlement_store;
pub mod store;
pub mod transfer_store;
pub mod world_store;

pub use disaster_store::DisasterStore;
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use settlement_store::SettlementStore;
pub use store::PgSimulationStore;
pub use transfer_store::TransferStore;
pub use world_store::WorldStore;
