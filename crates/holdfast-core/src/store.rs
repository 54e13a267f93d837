//! Persistence seam for the engine.
//!
//! [`SimulationStore`] is everything the passes read and write. Methods that
//! change more than one row (enqueueing a build, completing one, delivering
//! a transfer) are single operations so implementations can make them
//! atomic. [`SimulationStore::claim`] is the per-entity compare-and-set that
//! keeps overlapping passes from processing the same entity twice.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use holdfast_types::{
    ConstructionQueueEntry, DisasterEvent, DisasterId, DisasterReport, ModifierAggregate,
    PopulationState, Region, ResourceAmounts, ResourceStock, ResourceTransfer, Settlement,
    SettlementId, StructureId, StructureInstance, Tile, TileId, TransferId, World, WorldId,
};

use crate::cadence::Cadence;
use crate::error::StoreError;

/// Result of an atomic enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The entry was stored and the cost deducted. Carries the entry as
    /// stored, whose position and status were fixed against the queue at
    /// write time.
    Accepted(ConstructionQueueEntry),
    /// Stock no longer covers the cost. Nothing was written.
    Unaffordable,
}

/// Storage backend for simulation state.
pub trait SimulationStore: Send + Sync + 'static {
    // ---- Worlds ----

    /// Every world with the active flag set.
    fn active_worlds(&self) -> impl Future<Output = Result<Vec<World>, StoreError>> + Send;

    /// Regions of a world.
    fn regions(&self, world_id: WorldId) -> impl Future<Output = Result<Vec<Region>, StoreError>> + Send;

    /// A tile by id.
    fn tile(&self, tile_id: TileId) -> impl Future<Output = Result<Option<Tile>, StoreError>> + Send;

    // ---- Settlements ----

    /// Every settlement in a world.
    fn settlements(
        &self,
        world_id: WorldId,
    ) -> impl Future<Output = Result<Vec<Settlement>, StoreError>> + Send;

    /// A settlement by id.
    fn settlement(
        &self,
        settlement_id: SettlementId,
    ) -> impl Future<Output = Result<Option<Settlement>, StoreError>> + Send;

    /// Add `bonus` to a settlement's resilience.
    fn add_resilience(
        &self,
        settlement_id: SettlementId,
        bonus: u32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Open (or extend) the emergency repair window.
    fn set_emergency_repair(
        &self,
        settlement_id: SettlementId,
        until: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    // ---- Structures and modifiers ----

    /// Structures of a settlement.
    fn structures(
        &self,
        settlement_id: SettlementId,
    ) -> impl Future<Output = Result<Vec<StructureInstance>, StoreError>> + Send;

    /// Set one structure's health.
    fn set_structure_health(
        &self,
        structure_id: StructureId,
        health: u8,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Cached modifier aggregates of a settlement.
    fn modifiers(
        &self,
        settlement_id: SettlementId,
    ) -> impl Future<Output = Result<Vec<ModifierAggregate>, StoreError>> + Send;

    /// Replace every aggregate row of a settlement in one transaction.
    fn replace_modifiers(
        &self,
        settlement_id: SettlementId,
        aggregates: Vec<ModifierAggregate>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    // ---- Stock and population ----

    /// Resource stock of a settlement.
    fn stock(
        &self,
        settlement_id: SettlementId,
    ) -> impl Future<Output = Result<Option<ResourceStock>, StoreError>> + Send;

    /// Overwrite a settlement's stock.
    fn save_stock(&self, stock: ResourceStock) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replace a settlement's stock only if it still equals `expected`.
    ///
    /// Compares every amount and `updated_at`. Returns `false` without
    /// writing when another writer got there first.
    fn replace_stock(
        &self,
        expected: ResourceStock,
        next: ResourceStock,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Population state of a settlement.
    fn population(
        &self,
        settlement_id: SettlementId,
    ) -> impl Future<Output = Result<Option<PopulationState>, StoreError>> + Send;

    /// Overwrite a settlement's population state.
    fn save_population(
        &self,
        state: PopulationState,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    // ---- Construction ----

    /// Queue entries of a settlement, any status.
    fn queue(
        &self,
        settlement_id: SettlementId,
    ) -> impl Future<Output = Result<Vec<ConstructionQueueEntry>, StoreError>> + Send;

    /// Store a new entry and deduct `cost`, all or nothing.
    ///
    /// The entry's position and whether it starts immediately are decided
    /// against the settlement's queue while it is held exclusively, so the
    /// in-progress limit holds under concurrent requests.
    fn enqueue_construction(
        &self,
        entry: ConstructionQueueEntry,
        cost: ResourceAmounts,
    ) -> impl Future<Output = Result<EnqueueOutcome, StoreError>> + Send;

    /// Overwrite an entry.
    fn save_queue_entry(
        &self,
        entry: ConstructionQueueEntry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Promote a queued entry to in-progress.
    ///
    /// Writes `entry` only if the stored entry is still queued and the
    /// settlement has a free build slot, checked while the queue is held
    /// exclusively. Returns whether the promotion happened.
    fn start_construction(
        &self,
        entry: ConstructionQueueEntry,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Mark an entry complete and insert or upgrade its structure, in one
    /// transaction.
    fn complete_construction(
        &self,
        entry: ConstructionQueueEntry,
        structure: StructureInstance,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    // ---- Disasters ----

    /// Disasters of a world that are not yet resolved.
    fn active_disasters(
        &self,
        world_id: WorldId,
    ) -> impl Future<Output = Result<Vec<DisasterEvent>, StoreError>> + Send;

    /// Store a new disaster.
    fn insert_disaster(
        &self,
        disaster: DisasterEvent,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrite a disaster (phase changes).
    fn save_disaster(
        &self,
        disaster: DisasterEvent,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Store a per-settlement disaster report.
    fn save_report(
        &self,
        report: DisasterReport,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Reports of one disaster.
    fn reports(
        &self,
        disaster_id: DisasterId,
    ) -> impl Future<Output = Result<Vec<DisasterReport>, StoreError>> + Send;

    // ---- Transfers ----

    /// Pending transfers with `due_at <= now`.
    fn due_transfers(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ResourceTransfer>, StoreError>> + Send;

    /// Deliver a pending transfer in one transaction.
    ///
    /// Marks it completed only if it is still pending and credits the
    /// destination, clamping each resource to `capacity`. Returns the
    /// quantities actually credited, or `None` if the transfer was already
    /// completed.
    fn complete_transfer(
        &self,
        transfer_id: TransferId,
        now: DateTime<Utc>,
        capacity: ResourceAmounts,
    ) -> impl Future<Output = Result<Option<ResourceAmounts>, StoreError>> + Send;

    // ---- Claims ----

    /// Claim `entity` for `(cadence, tick)`.
    ///
    /// Succeeds only if the stored marker is absent or below `tick`, and
    /// moves it to `tick` atomically.
    fn claim(
        &self,
        entity: Uuid,
        cadence: Cadence,
        tick: u64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Highest tick any claim marker holds, or 0 when there are none.
    ///
    /// A restarted scheduler resumes counting from here so its ticks are
    /// above every marker left by the previous run.
    fn last_claimed_tick(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
}
