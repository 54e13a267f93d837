//! In-memory [`SimulationStore`].
//!
//! All state sits behind a single async mutex, which makes every trait
//! method trivially atomic. Used by tests and by local runs without a
//! database. The `insert_*` helpers seed state that the engine itself never
//! creates (worlds, regions, tiles, settlements).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use holdfast_types::{
    ConstructionQueueEntry, DisasterEvent, DisasterId, DisasterReport, DisasterStatus, ModifierAggregate,
    PopulationState, QueueEntryId, QueueStatus, Region, RegionId, ResourceAmounts, ResourceStock, ResourceTransfer,
    Settlement, SettlementId, StructureId, StructureInstance, Tile, TileId, TransferId, TransferStatus,
    World, WorldId,
};

use holdfast_economy::construction;

use crate::cadence::Cadence;
use crate::error::StoreError;
use crate::store::{EnqueueOutcome, SimulationStore};

#[derive(Debug, Default)]
struct MemoryState {
    worlds: BTreeMap<WorldId, World>,
    regions: BTreeMap<RegionId, Region>,
    tiles: BTreeMap<TileId, Tile>,
    settlements: BTreeMap<SettlementId, Settlement>,
    structures: BTreeMap<StructureId, StructureInstance>,
    stock: BTreeMap<SettlementId, ResourceStock>,
    population: BTreeMap<SettlementId, PopulationState>,
    modifiers: BTreeMap<SettlementId, Vec<ModifierAggregate>>,
    queue: BTreeMap<QueueEntryId, ConstructionQueueEntry>,
    disasters: BTreeMap<DisasterId, DisasterEvent>,
    reports: Vec<DisasterReport>,
    transfers: BTreeMap<TransferId, ResourceTransfer>,
    claims: BTreeMap<(Uuid, Cadence), u64>,
}

/// Store keeping everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Insert or replace a world.
    pub async fn insert_world(&self, world: World) {
        self.state.lock().await.worlds.insert(world.id, world);
    }

    /// Insert or replace a region.
    pub async fn insert_region(&self, region: Region) {
        self.state.lock().await.regions.insert(region.id, region);
    }

    /// Insert or replace a tile.
    pub async fn insert_tile(&self, tile: Tile) {
        self.state.lock().await.tiles.insert(tile.id, tile);
    }

    /// Insert or replace a settlement.
    pub async fn insert_settlement(&self, settlement: Settlement) {
        self.state
            .lock()
            .await
            .settlements
            .insert(settlement.id, settlement);
    }

    /// Insert or replace a structure.
    pub async fn insert_structure(&self, structure: StructureInstance) {
        self.state
            .lock()
            .await
            .structures
            .insert(structure.id, structure);
    }

    /// Insert or replace a pending transfer.
    pub async fn insert_transfer(&self, transfer: ResourceTransfer) {
        self.state
            .lock()
            .await
            .transfers
            .insert(transfer.id, transfer);
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// A disaster by id, any status.
    pub async fn disaster(&self, disaster_id: DisasterId) -> Option<DisasterEvent> {
        self.state.lock().await.disasters.get(&disaster_id).cloned()
    }

    /// Every stored disaster of a world, any status.
    pub async fn all_disasters(&self, world_id: WorldId) -> Vec<DisasterEvent> {
        self.state
            .lock()
            .await
            .disasters
            .values()
            .filter(|d| d.world_id == world_id)
            .cloned()
            .collect()
    }

    /// A structure by id.
    pub async fn structure(&self, structure_id: StructureId) -> Option<StructureInstance> {
        self.state.lock().await.structures.get(&structure_id).cloned()
    }

    /// A transfer by id.
    pub async fn transfer(&self, transfer_id: TransferId) -> Option<ResourceTransfer> {
        self.state.lock().await.transfers.get(&transfer_id).cloned()
    }
}

fn clamp_credit(current: ResourceAmounts, credit: ResourceAmounts, capacity: ResourceAmounts) -> ResourceAmounts {
    current.map(|resource, amount| {
        let room = capacity.get(resource).saturating_sub(amount).max(Decimal::ZERO);
        credit.get(resource).max(Decimal::ZERO).min(room)
    })
}

impl SimulationStore for MemoryStore {
    async fn active_worlds(&self) -> Result<Vec<World>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .worlds
            .values()
            .filter(|w| w.active)
            .cloned()
            .collect())
    }

    async fn regions(&self, world_id: WorldId) -> Result<Vec<Region>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .regions
            .values()
            .filter(|r| r.world_id == world_id)
            .cloned()
            .collect())
    }

    async fn tile(&self, tile_id: TileId) -> Result<Option<Tile>, StoreError> {
        Ok(self.state.lock().await.tiles.get(&tile_id).cloned())
    }

    async fn settlements(&self, world_id: WorldId) -> Result<Vec<Settlement>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .settlements
            .values()
            .filter(|s| s.world_id == world_id)
            .cloned()
            .collect())
    }

    async fn settlement(&self, settlement_id: SettlementId) -> Result<Option<Settlement>, StoreError> {
        Ok(self.state.lock().await.settlements.get(&settlement_id).cloned())
    }

    async fn add_resilience(&self, settlement_id: SettlementId, bonus: u32) -> Result<(), StoreError> {
        if let Some(settlement) = self.state.lock().await.settlements.get_mut(&settlement_id) {
            settlement.resilience = settlement.resilience.saturating_add(bonus);
        }
        Ok(())
    }

    async fn set_emergency_repair(
        &self,
        settlement_id: SettlementId,
        until: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(settlement) = self.state.lock().await.settlements.get_mut(&settlement_id) {
            let extended = settlement.emergency_repair_until.map_or(until, |at| at.max(until));
            settlement.emergency_repair_until = Some(extended);
        }
        Ok(())
    }

    async fn structures(&self, settlement_id: SettlementId) -> Result<Vec<StructureInstance>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .structures
            .values()
            .filter(|s| s.settlement_id == settlement_id)
            .cloned()
            .collect())
    }

    async fn set_structure_health(&self, structure_id: StructureId, health: u8) -> Result<(), StoreError> {
        if let Some(structure) = self.state.lock().await.structures.get_mut(&structure_id) {
            structure.health = Some(health.min(100));
        }
        Ok(())
    }

    async fn modifiers(&self, settlement_id: SettlementId) -> Result<Vec<ModifierAggregate>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .modifiers
            .get(&settlement_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_modifiers(
        &self,
        settlement_id: SettlementId,
        aggregates: Vec<ModifierAggregate>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if aggregates.is_empty() {
            state.modifiers.remove(&settlement_id);
        } else {
            state.modifiers.insert(settlement_id, aggregates);
        }
        Ok(())
    }

    async fn stock(&self, settlement_id: SettlementId) -> Result<Option<ResourceStock>, StoreError> {
        Ok(self.state.lock().await.stock.get(&settlement_id).cloned())
    }

    async fn save_stock(&self, stock: ResourceStock) -> Result<(), StoreError> {
        self.state.lock().await.stock.insert(stock.settlement_id, stock);
        Ok(())
    }

    async fn replace_stock(&self, expected: ResourceStock, next: ResourceStock) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if state.stock.get(&expected.settlement_id) != Some(&expected) {
            return Ok(false);
        }
        state.stock.insert(next.settlement_id, next);
        Ok(true)
    }

    async fn population(&self, settlement_id: SettlementId) -> Result<Option<PopulationState>, StoreError> {
        Ok(self.state.lock().await.population.get(&settlement_id).cloned())
    }

    async fn save_population(&self, state: PopulationState) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .population
            .insert(state.settlement_id, state);
        Ok(())
    }

    async fn queue(&self, settlement_id: SettlementId) -> Result<Vec<ConstructionQueueEntry>, StoreError> {
        let mut entries: Vec<ConstructionQueueEntry> = self
            .state
            .lock()
            .await
            .queue
            .values()
            .filter(|e| e.settlement_id == settlement_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.position);
        Ok(entries)
    }

    async fn enqueue_construction(
        &self,
        entry: ConstructionQueueEntry,
        cost: ResourceAmounts,
    ) -> Result<EnqueueOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let Some(stock) = state.stock.get_mut(&entry.settlement_id) else {
            return Ok(EnqueueOutcome::Unaffordable);
        };
        let affordable = stock
            .amounts
            .iter()
            .all(|(resource, amount)| amount >= cost.get(resource));
        if !affordable {
            return Ok(EnqueueOutcome::Unaffordable);
        }
        stock.amounts = stock.amounts.saturating_sub(cost);
        let current = settlement_queue(&state, entry.settlement_id);
        let stored = construction::admit(entry, &current);
        state.queue.insert(stored.id, stored.clone());
        Ok(EnqueueOutcome::Accepted(stored))
    }

    async fn save_queue_entry(&self, entry: ConstructionQueueEntry) -> Result<(), StoreError> {
        self.state.lock().await.queue.insert(entry.id, entry);
        Ok(())
    }

    async fn start_construction(&self, entry: ConstructionQueueEntry) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let still_queued = state
            .queue
            .get(&entry.id)
            .is_some_and(|stored| stored.status == QueueStatus::Queued);
        if !still_queued || !construction::has_free_slot(&settlement_queue(&state, entry.settlement_id)) {
            return Ok(false);
        }
        state.queue.insert(entry.id, entry);
        Ok(true)
    }

    async fn complete_construction(
        &self,
        entry: ConstructionQueueEntry,
        structure: StructureInstance,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.structures.insert(structure.id, structure);
        state.queue.insert(entry.id, entry);
        Ok(())
    }

    async fn active_disasters(&self, world_id: WorldId) -> Result<Vec<DisasterEvent>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .disasters
            .values()
            .filter(|d| d.world_id == world_id && d.status() != DisasterStatus::Resolved)
            .cloned()
            .collect())
    }

    async fn insert_disaster(&self, disaster: DisasterEvent) -> Result<(), StoreError> {
        self.state.lock().await.disasters.insert(disaster.id, disaster);
        Ok(())
    }

    async fn save_disaster(&self, disaster: DisasterEvent) -> Result<(), StoreError> {
        self.state.lock().await.disasters.insert(disaster.id, disaster);
        Ok(())
    }

    async fn save_report(&self, report: DisasterReport) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .reports
            .retain(|r| !(r.disaster_id == report.disaster_id && r.settlement_id == report.settlement_id));
        state.reports.push(report);
        Ok(())
    }

    async fn reports(&self, disaster_id: DisasterId) -> Result<Vec<DisasterReport>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .reports
            .iter()
            .filter(|r| r.disaster_id == disaster_id)
            .cloned()
            .collect())
    }

    async fn due_transfers(&self, now: DateTime<Utc>) -> Result<Vec<ResourceTransfer>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .transfers
            .values()
            .filter(|t| t.status == TransferStatus::Pending && t.due_at <= now)
            .cloned()
            .collect())
    }

    async fn complete_transfer(
        &self,
        transfer_id: TransferId,
        now: DateTime<Utc>,
        capacity: ResourceAmounts,
    ) -> Result<Option<ResourceAmounts>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(transfer) = state.transfers.get_mut(&transfer_id) else {
            return Ok(None);
        };
        if transfer.status != TransferStatus::Pending {
            return Ok(None);
        }
        transfer.status = TransferStatus::Completed;
        transfer.completed_at = Some(now);
        let destination = transfer.destination;
        let amounts = transfer.amounts;

        let Some(stock) = state.stock.get_mut(&destination) else {
            return Ok(Some(ResourceAmounts::ZERO));
        };
        let credited = clamp_credit(stock.amounts, amounts, capacity);
        stock.amounts = stock.amounts.saturating_add(credited);
        Ok(Some(credited))
    }

    async fn claim(&self, entity: Uuid, cadence: Cadence, tick: u64) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.claims.get(&(entity, cadence)) {
            Some(&last) if last >= tick => Ok(false),
            _ => {
                state.claims.insert((entity, cadence), tick);
                Ok(true)
            }
        }
    }

    async fn last_claimed_tick(&self) -> Result<u64, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .claims
            .values()
            .copied()
            .max()
            .unwrap_or(0))
    }
}

fn settlement_queue(state: &MemoryState, settlement_id: SettlementId) -> Vec<ConstructionQueueEntry> {
    state
        .queue
        .values()
        .filter(|e| e.settlement_id == settlement_id)
        .cloned()
        .collect()
}
