//! [`SimulationStore`] backed by `PostgreSQL`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use holdfast_core::store::{EnqueueOutcome, SimulationStore};
use holdfast_core::{Cadence, StoreError};
use holdfast_types::{
    ConstructionQueueEntry, DisasterEvent, DisasterId, DisasterReport, ModifierAggregate,
    PopulationState, Region, ResourceAmounts, ResourceStock, ResourceTransfer, Settlement,
    SettlementId, StructureId, StructureInstance, Tile, TileId, TransferId, World, WorldId,
};

use crate::disaster_store::DisasterStore;
use crate::settlement_store::SettlementStore;
use crate::transfer_store::TransferStore;
use crate::world_store::WorldStore;

/// The engine's persistence backend over a `PostgreSQL` pool.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct PgSimulationStore {
    pool: PgPool,
}

impl PgSimulationStore {
    /// Wrap an existing pool. Migrations must already have run.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// World, region, tile, and settlement operations.
    pub const fn world_store(&self) -> WorldStore<'_> {
        WorldStore::new(&self.pool)
    }

    /// Structure, stock, population, and queue operations.
    pub const fn settlement_store(&self) -> SettlementStore<'_> {
        SettlementStore::new(&self.pool)
    }

    /// Disaster and report operations.
    pub const fn disaster_store(&self) -> DisasterStore<'_> {
        DisasterStore::new(&self.pool)
    }

    /// Transfer and claim operations.
    pub const fn transfer_store(&self) -> TransferStore<'_> {
        TransferStore::new(&self.pool)
    }
}

impl SimulationStore for PgSimulationStore {
    async fn active_worlds(&self) -> Result<Vec<World>, StoreError> {
        Ok(self.world_store().active_worlds().await?)
    }

    async fn regions(&self, world_id: WorldId) -> Result<Vec<Region>, StoreError> {
        Ok(self.world_store().regions(world_id).await?)
    }

    async fn tile(&self, tile_id: TileId) -> Result<Option<Tile>, StoreError> {
        Ok(self.world_store().tile(tile_id).await?)
    }

    async fn settlements(&self, world_id: WorldId) -> Result<Vec<Settlement>, StoreError> {
        Ok(self.world_store().settlements(world_id).await?)
    }

    async fn settlement(&self, settlement_id: SettlementId) -> Result<Option<Settlement>, StoreError> {
        Ok(self.world_store().settlement(settlement_id).await?)
    }

    async fn add_resilience(&self, settlement_id: SettlementId, bonus: u32) -> Result<(), StoreError> {
        Ok(self.world_store().add_resilience(settlement_id, bonus).await?)
    }

    async fn set_emergency_repair(
        &self,
        settlement_id: SettlementId,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Ok(self.world_store().set_emergency_repair(settlement_id, until).await?)
    }

    async fn structures(&self, settlement_id: SettlementId) -> Result<Vec<StructureInstance>, StoreError> {
        Ok(self.settlement_store().structures(settlement_id).await?)
    }

    async fn set_structure_health(&self, structure_id: StructureId, health: u8) -> Result<(), StoreError> {
        Ok(self.settlement_store().set_structure_health(structure_id, health).await?)
    }

    async fn modifiers(&self, settlement_id: SettlementId) -> Result<Vec<ModifierAggregate>, StoreError> {
        Ok(self.settlement_store().modifiers(settlement_id).await?)
    }

    async fn replace_modifiers(
        &self,
        settlement_id: SettlementId,
        aggregates: Vec<ModifierAggregate>,
    ) -> Result<(), StoreError> {
        Ok(self
            .settlement_store()
            .replace_modifiers(settlement_id, &aggregates)
            .await?)
    }

    async fn stock(&self, settlement_id: SettlementId) -> Result<Option<ResourceStock>, StoreError> {
        Ok(self.settlement_store().stock(settlement_id).await?)
    }

    async fn save_stock(&self, stock: ResourceStock) -> Result<(), StoreError> {
        Ok(self.settlement_store().save_stock(&stock).await?)
    }

    async fn replace_stock(&self, expected: ResourceStock, next: ResourceStock) -> Result<bool, StoreError> {
        Ok(self.settlement_store().replace_stock(&expected, &next).await?)
    }

    async fn population(&self, settlement_id: SettlementId) -> Result<Option<PopulationState>, StoreError> {
        Ok(self.settlement_store().population(settlement_id).await?)
    }

    async fn save_population(&self, state: PopulationState) -> Result<(), StoreError> {
        Ok(self.settlement_store().save_population(&state).await?)
    }

    async fn queue(&self, settlement_id: SettlementId) -> Result<Vec<ConstructionQueueEntry>, StoreError> {
        Ok(self.settlement_store().queue(settlement_id).await?)
    }

    async fn enqueue_construction(
        &self,
        entry: ConstructionQueueEntry,
        cost: ResourceAmounts,
    ) -> Result<EnqueueOutcome, StoreError> {
        let stored = self.settlement_store().enqueue_construction(&entry, &cost).await?;
        Ok(stored.map_or(EnqueueOutcome::Unaffordable, EnqueueOutcome::Accepted))
    }

    async fn save_queue_entry(&self, entry: ConstructionQueueEntry) -> Result<(), StoreError> {
        Ok(self.settlement_store().save_queue_entry(&entry).await?)
    }

    async fn start_construction(&self, entry: ConstructionQueueEntry) -> Result<bool, StoreError> {
        Ok(self.settlement_store().start_construction(&entry).await?)
    }

    async fn complete_construction(
        &self,
        entry: ConstructionQueueEntry,
        structure: StructureInstance,
    ) -> Result<(), StoreError> {
        Ok(self
            .settlement_store()
            .complete_construction(&entry, &structure)
            .await?)
    }

    async fn active_disasters(&self, world_id: WorldId) -> Result<Vec<DisasterEvent>, StoreError> {
        Ok(self.disaster_store().active(world_id).await?)
    }

    async fn insert_disaster(&self, disaster: DisasterEvent) -> Result<(), StoreError> {
        Ok(self.disaster_store().insert(&disaster).await?)
    }

    async fn save_disaster(&self, disaster: DisasterEvent) -> Result<(), StoreError> {
        Ok(self.disaster_store().save(&disaster).await?)
    }

    async fn save_report(&self, report: DisasterReport) -> Result<(), StoreError> {
        Ok(self.disaster_store().save_report(&report).await?)
    }

    async fn reports(&self, disaster_id: DisasterId) -> Result<Vec<DisasterReport>, StoreError> {
        Ok(self.disaster_store().reports(disaster_id).await?)
    }

    async fn due_transfers(&self, now: DateTime<Utc>) -> Result<Vec<ResourceTransfer>, StoreError> {
        Ok(self.transfer_store().due(now).await?)
    }

    async fn complete_transfer(
        &self,
        transfer_id: TransferId,
        now: DateTime<Utc>,
        capacity: ResourceAmounts,
    ) -> Result<Option<ResourceAmounts>, StoreError> {
        Ok(self.transfer_store().complete(transfer_id, now, capacity).await?)
    }

    async fn claim(&self, entity: Uuid, cadence: Cadence, tick: u64) -> Result<bool, StoreError> {
        Ok(self.transfer_store().claim(entity, cadence, tick).await?)
    }

    async fn last_claimed_tick(&self) -> Result<u64, StoreError> {
        Ok(self.transfer_store().last_claimed_tick().await?)
    }
}
