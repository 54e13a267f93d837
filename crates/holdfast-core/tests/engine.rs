//! End-to-end cadence passes against the in-memory store.

// Tests panic on any unexpected state.
#![allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::too_many_lines
)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

use holdfast_core::{
    BroadcastPublisher, Cadence, EnqueueOutcome, Engine, EngineConfig, EngineError, ManualClock, MemoryStore,
    Scheduler, SimulationStore, StoreError,
};
use holdfast_economy::{BuildRequest, EconomyError};
use holdfast_types::{
    Biome, Channel, ConstructionQueueEntry, DisasterEvent, DisasterId, DisasterPhase, DisasterReport,
    DisasterStatus, DisasterType, EngineEvent, ModifierAggregate, PlayerId, PopulationState,
    PopulationWarningReason, QueueEntryId, QueueStatus, Region, RegionId, ResourceAmounts, ResourceStock,
    ResourceTransfer, Settlement, SettlementId, StructureCategory, StructureId, StructureInstance, StructureType,
    Tile, TileId, TileQuality, TransferId, TransferStatus, World, WorldId, WorldTemplate,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

struct Fixture<S = MemoryStore> {
    engine: Arc<Engine<S, BroadcastPublisher>>,
    store: Arc<MemoryStore>,
    publisher: Arc<BroadcastPublisher>,
    clock: Arc<ManualClock>,
    world: World,
    region: RegionId,
    settlement: Settlement,
    start: DateTime<Utc>,
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

impl Fixture {
    /// One active world with one grassland settlement of a single settler.
    async fn new() -> Self {
        Self::with_store(Arc::clone).await
    }
}

impl Fixture<FaultyStore> {
    /// Same world, with the engine reading through a [`FaultyStore`].
    async fn faulty() -> Self {
        Self::with_store(|memory| Arc::new(FaultyStore::new(Arc::clone(memory)))).await
    }

    fn faults(&self) -> &FaultyStore {
        self.engine.store()
    }
}

impl<S: SimulationStore> Fixture<S> {
    async fn with_store(wrap: impl FnOnce(&Arc<MemoryStore>) -> Arc<S>) -> Self {
        let start = start_time();
        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(BroadcastPublisher::default());
        let clock = Arc::new(ManualClock::new(start));

        let mut config = EngineConfig::default();
        config.scheduler.seed = Some(42);
        let engine = Arc::new(Engine::new(wrap(&store), Arc::clone(&publisher), clock.clone(), config));

        let world = World {
            id: WorldId::new(),
            name: String::from("Testland"),
            active: true,
            template: WorldTemplate::default(),
        };
        let region = Region {
            id: RegionId::new(),
            world_id: world.id,
            name: String::from("Greenvale"),
            biome_tiles: BTreeMap::from([(Biome::Grassland, 12)]),
        };
        let tile = Tile {
            id: TileId::new(),
            region_id: region.id,
            biome: Biome::Grassland,
            quality: TileQuality {
                food: 100,
                ..TileQuality::default()
            },
        };
        let settlement = Settlement {
            id: SettlementId::new(),
            player_id: PlayerId::new(),
            world_id: world.id,
            region_id: region.id,
            tile_id: tile.id,
            name: String::from("Holdfast"),
            resilience: 0,
            emergency_repair_until: None,
        };

        store.insert_world(world.clone()).await;
        store.insert_region(region.clone()).await;
        store.insert_tile(tile).await;
        store.insert_settlement(settlement.clone()).await;
        store
            .save_stock(ResourceStock {
                settlement_id: settlement.id,
                amounts: ResourceAmounts::ZERO,
                updated_at: start,
            })
            .await
            .unwrap();
        store
            .save_population(PopulationState {
                settlement_id: settlement.id,
                current: 1,
                happiness: 50,
                last_growth_tick: 0,
                growth_carry: 0.0,
                updated_at: start,
            })
            .await
            .unwrap();

        Self {
            engine,
            store,
            publisher,
            clock,
            world,
            region: region.id,
            settlement,
            start,
        }
    }

    /// Another settlement in the same world, with its own stock and
    /// population, on a grassland tile of `region`.
    async fn add_settlement(&self, name: &str, region: RegionId, population: u32) -> Settlement {
        let tile = Tile {
            id: TileId::new(),
            region_id: region,
            biome: Biome::Grassland,
            quality: TileQuality {
                food: 100,
                ..TileQuality::default()
            },
        };
        let settlement = Settlement {
            id: SettlementId::new(),
            player_id: PlayerId::new(),
            region_id: region,
            tile_id: tile.id,
            name: String::from(name),
            ..self.settlement.clone()
        };
        self.store.insert_tile(tile).await;
        self.store.insert_settlement(settlement.clone()).await;
        self.store
            .save_stock(ResourceStock {
                settlement_id: settlement.id,
                amounts: ResourceAmounts::ZERO,
                updated_at: self.start,
            })
            .await
            .unwrap();
        self.store
            .save_population(PopulationState {
                settlement_id: settlement.id,
                current: population,
                happiness: 50,
                last_growth_tick: 0,
                growth_carry: 0.0,
                updated_at: self.start,
            })
            .await
            .unwrap();
        settlement
    }

    /// A second region of the same world.
    async fn add_region(&self, name: &str) -> RegionId {
        let region = Region {
            id: RegionId::new(),
            world_id: self.world.id,
            name: String::from(name),
            biome_tiles: BTreeMap::from([(Biome::Grassland, 4)]),
        };
        self.store.insert_region(region.clone()).await;
        region.id
    }

    async fn add_structure(&self, structure_type: StructureType, category: StructureCategory, health: Option<u8>) -> StructureId {
        self.add_structure_to(self.settlement.id, structure_type, category, health).await
    }

    async fn add_structure_to(
        &self,
        settlement_id: SettlementId,
        structure_type: StructureType,
        category: StructureCategory,
        health: Option<u8>,
    ) -> StructureId {
        let id = StructureId::new();
        self.store
            .insert_structure(StructureInstance {
                id,
                settlement_id,
                category,
                structure_type,
                level: 1,
                health,
                population_assigned: 0,
                built_at: self.start,
            })
            .await;
        id
    }

    async fn set_stock(&self, amounts: ResourceAmounts) {
        self.store
            .save_stock(ResourceStock {
                settlement_id: self.settlement.id,
                amounts,
                updated_at: self.clock_now(),
            })
            .await
            .unwrap();
    }

    async fn set_population(&self, current: u32) {
        let mut state = self.store.population(self.settlement.id).await.unwrap().unwrap();
        state.current = current;
        self.store.save_population(state).await.unwrap();
    }

    fn clock_now(&self) -> DateTime<Utc> {
        self.engine.now()
    }

    async fn stock(&self) -> ResourceAmounts {
        self.store.stock(self.settlement.id).await.unwrap().unwrap().amounts
    }

    async fn subscribe_settlement(&self) -> broadcast::Receiver<EngineEvent> {
        self.publisher.subscribe(Channel::Settlement(self.settlement.id)).await
    }

    async fn subscribe_world(&self) -> broadcast::Receiver<EngineEvent> {
        self.publisher.subscribe(Channel::World(self.world.id)).await
    }
}

fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn kinds(events: &[EngineEvent]) -> Vec<&'static str> {
    events.iter().map(EngineEvent::kind).collect()
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// Memory store that fails or interleaves chosen calls.
struct FaultyStore {
    inner: Arc<MemoryStore>,
    /// `structures` fails for this settlement.
    broken: Mutex<Option<SettlementId>>,
    /// Credited to this settlement just before its next guarded stock write.
    credit_before_write: Mutex<Option<(SettlementId, ResourceAmounts)>>,
}

impl FaultyStore {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            broken: Mutex::new(None),
            credit_before_write: Mutex::new(None),
        }
    }

    fn break_structures_of(&self, settlement_id: SettlementId) {
        *self.broken.lock().unwrap() = Some(settlement_id);
    }

    fn credit_before_next_write(&self, settlement_id: SettlementId, amounts: ResourceAmounts) {
        *self.credit_before_write.lock().unwrap() = Some((settlement_id, amounts));
    }
}

fn injected() -> StoreError {
    StoreError::Backend("injected failure".into())
}

impl SimulationStore for FaultyStore {
    async fn active_worlds(&self) -> Result<Vec<World>, StoreError> {
        self.inner.active_worlds().await
    }

    async fn regions(&self, world_id: WorldId) -> Result<Vec<Region>, StoreError> {
        self.inner.regions(world_id).await
    }

    async fn tile(&self, tile_id: TileId) -> Result<Option<Tile>, StoreError> {
        self.inner.tile(tile_id).await
    }

    async fn settlements(&self, world_id: WorldId) -> Result<Vec<Settlement>, StoreError> {
        self.inner.settlements(world_id).await
    }

    async fn settlement(&self, settlement_id: SettlementId) -> Result<Option<Settlement>, StoreError> {
        self.inner.settlement(settlement_id).await
    }

    async fn add_resilience(&self, settlement_id: SettlementId, bonus: u32) -> Result<(), StoreError> {
        self.inner.add_resilience(settlement_id, bonus).await
    }

    async fn set_emergency_repair(&self, settlement_id: SettlementId, until: DateTime<Utc>) -> Result<(), StoreError> {
        self.inner.set_emergency_repair(settlement_id, until).await
    }

    async fn structures(&self, settlement_id: SettlementId) -> Result<Vec<StructureInstance>, StoreError> {
        if *self.broken.lock().unwrap() == Some(settlement_id) {
            return Err(injected());
        }
        self.inner.structures(settlement_id).await
    }

    async fn set_structure_health(&self, structure_id: StructureId, health: u8) -> Result<(), StoreError> {
        self.inner.set_structure_health(structure_id, health).await
    }

    async fn modifiers(&self, settlement_id: SettlementId) -> Result<Vec<ModifierAggregate>, StoreError> {
        self.inner.modifiers(settlement_id).await
    }

    async fn replace_modifiers(
        &self,
        settlement_id: SettlementId,
        aggregates: Vec<ModifierAggregate>,
    ) -> Result<(), StoreError> {
        self.inner.replace_modifiers(settlement_id, aggregates).await
    }

    async fn stock(&self, settlement_id: SettlementId) -> Result<Option<ResourceStock>, StoreError> {
        self.inner.stock(settlement_id).await
    }

    async fn save_stock(&self, stock: ResourceStock) -> Result<(), StoreError> {
        self.inner.save_stock(stock).await
    }

    async fn replace_stock(&self, expected: ResourceStock, next: ResourceStock) -> Result<bool, StoreError> {
        let credit = {
            let mut pending = self.credit_before_write.lock().unwrap();
            if pending.is_some_and(|(id, _)| id == expected.settlement_id) {
                pending.take()
            } else {
                None
            }
        };
        if let Some((settlement_id, amounts)) = credit {
            let mut stock = self.inner.stock(settlement_id).await?.unwrap();
            stock.amounts = stock.amounts.saturating_add(amounts);
            self.inner.save_stock(stock).await?;
        }
        self.inner.replace_stock(expected, next).await
    }

    async fn population(&self, settlement_id: SettlementId) -> Result<Option<PopulationState>, StoreError> {
        self.inner.population(settlement_id).await
    }

    async fn save_population(&self, state: PopulationState) -> Result<(), StoreError> {
        self.inner.save_population(state).await
    }

    async fn queue(&self, settlement_id: SettlementId) -> Result<Vec<ConstructionQueueEntry>, StoreError> {
        self.inner.queue(settlement_id).await
    }

    async fn enqueue_construction(
        &self,
        entry: ConstructionQueueEntry,
        cost: ResourceAmounts,
    ) -> Result<EnqueueOutcome, StoreError> {
        self.inner.enqueue_construction(entry, cost).await
    }

    async fn save_queue_entry(&self, entry: ConstructionQueueEntry) -> Result<(), StoreError> {
        self.inner.save_queue_entry(entry).await
    }

    async fn start_construction(&self, entry: ConstructionQueueEntry) -> Result<bool, StoreError> {
        self.inner.start_construction(entry).await
    }

    async fn complete_construction(
        &self,
        entry: ConstructionQueueEntry,
        structure: StructureInstance,
    ) -> Result<(), StoreError> {
        self.inner.complete_construction(entry, structure).await
    }

    async fn active_disasters(&self, world_id: WorldId) -> Result<Vec<DisasterEvent>, StoreError> {
        self.inner.active_disasters(world_id).await
    }

    async fn insert_disaster(&self, disaster: DisasterEvent) -> Result<(), StoreError> {
        self.inner.insert_disaster(disaster).await
    }

    async fn save_disaster(&self, disaster: DisasterEvent) -> Result<(), StoreError> {
        self.inner.save_disaster(disaster).await
    }

    async fn save_report(&self, report: DisasterReport) -> Result<(), StoreError> {
        self.inner.save_report(report).await
    }

    async fn reports(&self, disaster_id: DisasterId) -> Result<Vec<DisasterReport>, StoreError> {
        self.inner.reports(disaster_id).await
    }

    async fn due_transfers(&self, now: DateTime<Utc>) -> Result<Vec<ResourceTransfer>, StoreError> {
        self.inner.due_transfers(now).await
    }

    async fn complete_transfer(
        &self,
        transfer_id: TransferId,
        now: DateTime<Utc>,
        capacity: ResourceAmounts,
    ) -> Result<Option<ResourceAmounts>, StoreError> {
        self.inner.complete_transfer(transfer_id, now, capacity).await
    }

    async fn claim(&self, entity: Uuid, cadence: Cadence, tick: u64) -> Result<bool, StoreError> {
        self.inner.claim(entity, cadence, tick).await
    }

    async fn last_claimed_tick(&self) -> Result<u64, StoreError> {
        self.inner.last_claimed_tick().await
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resource_apply_credits_farm_output() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let mut rx = fx.subscribe_settlement().await;

    // 60 ticks: a level-1 farm on a quality-100 grassland tile makes 6.0 food;
    // one settler eats 0.3 food and drinks 0.6 water.
    fx.clock.advance(TimeDelta::seconds(1));
    fx.engine.run_cadence(Cadence::ResourceApply, 1).await.unwrap();

    let stock = fx.store.stock(fx.settlement.id).await.unwrap().unwrap();
    assert_eq!(stock.amounts.food, dec!(5.7));
    assert_eq!(stock.amounts.water, Decimal::ZERO);
    assert_eq!(stock.updated_at, fx.start + TimeDelta::seconds(1));

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec!["resource-update", "resource-shortage"]);
    match &events[0] {
        EngineEvent::ResourceUpdate { delta, tick, .. } => {
            assert_eq!(*tick, 1);
            assert_eq!(delta.food, dec!(5.7));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn resource_apply_keeps_sub_tick_remainder() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;

    // 1.01 s is 60 whole ticks; the extra 10 ms stays pending.
    fx.clock.advance(TimeDelta::milliseconds(1_010));
    fx.engine.run_cadence(Cadence::ResourceApply, 1).await.unwrap();

    let stock = fx.store.stock(fx.settlement.id).await.unwrap().unwrap();
    assert_eq!(stock.updated_at, fx.start + TimeDelta::seconds(1));
}

#[tokio::test]
async fn resource_apply_is_claimed_once_per_tick() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;

    fx.clock.advance(TimeDelta::seconds(1));
    fx.engine.run_cadence(Cadence::ResourceApply, 5).await.unwrap();
    fx.clock.advance(TimeDelta::seconds(1));
    fx.engine.run_cadence(Cadence::ResourceApply, 5).await.unwrap();

    assert_eq!(fx.stock().await.food, dec!(5.7));
}

#[tokio::test]
async fn resource_preview_does_not_write() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let mut rx = fx.subscribe_settlement().await;

    fx.clock.advance(TimeDelta::seconds(1));
    fx.engine.run_cadence(Cadence::ResourcePreview, 60).await.unwrap();

    assert!(fx.stock().await.is_zero());
    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec!["resource-preview"]);
    match &events[0] {
        EngineEvent::ResourcePreview {
            projected,
            net_per_hour,
            ..
        } => {
            assert_eq!(projected.food, dec!(5.7));
            // 216000 ticks: 21600 produced, 18 eaten.
            assert_eq!(net_per_hour.food, dec!(21582));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

#[tokio::test]
async fn population_pass_warns_on_shortage() {
    let fx = Fixture::new().await;
    fx.set_population(5).await;
    let mut rx = fx.subscribe_settlement().await;

    fx.clock.advance(TimeDelta::minutes(30));
    fx.engine.run_cadence(Cadence::Population, 108_000).await.unwrap();

    let state = fx.store.population(fx.settlement.id).await.unwrap().unwrap();
    assert_eq!(state.last_growth_tick, 108_000);
    assert!(state.current >= 1 && state.current <= 10);
    assert_eq!(state.updated_at, fx.start + TimeDelta::minutes(30));

    let events = drain(&mut rx);
    let warning = events.iter().find_map(|e| match e {
        EngineEvent::PopulationWarning { reasons, .. } => Some(reasons.clone()),
        _ => None,
    });
    let reasons = warning.unwrap();
    assert!(reasons.contains(&PopulationWarningReason::FoodShortage));
    assert!(reasons.contains(&PopulationWarningReason::WaterShortage));
    assert_eq!(kinds(&events).last(), Some(&"population-state"));
}

fn warning_reasons(events: &[EngineEvent]) -> Vec<PopulationWarningReason> {
    events
        .iter()
        .find_map(|e| match e {
            EngineEvent::PopulationWarning { reasons, .. } => Some(reasons.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn population_needs_stock_for_the_whole_window() {
    let fx = Fixture::new().await;
    fx.set_population(5).await;
    // Five settlers eat 2700 food and drink 5400 water in thirty minutes.
    fx.set_stock(ResourceAmounts::uniform(dec!(1000))).await;
    let mut rx = fx.subscribe_settlement().await;

    fx.clock.advance(TimeDelta::minutes(30));
    fx.engine.run_cadence(Cadence::Population, 108_000).await.unwrap();

    let reasons = warning_reasons(&drain(&mut rx));
    assert!(reasons.contains(&PopulationWarningReason::FoodShortage));
    assert!(reasons.contains(&PopulationWarningReason::WaterShortage));
}

#[tokio::test]
async fn population_with_enough_stock_is_not_short() {
    let fx = Fixture::new().await;
    fx.set_population(5).await;
    fx.set_stock(ResourceAmounts::uniform(dec!(6000))).await;
    let mut rx = fx.subscribe_settlement().await;

    fx.clock.advance(TimeDelta::minutes(30));
    fx.engine.run_cadence(Cadence::Population, 108_000).await.unwrap();

    let reasons = warning_reasons(&drain(&mut rx));
    assert!(!reasons.contains(&PopulationWarningReason::FoodShortage));
    assert!(!reasons.contains(&PopulationWarningReason::WaterShortage));
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

fn farm() -> BuildRequest {
    BuildRequest {
        structure_type: StructureType::Farm,
        upgrade_of: None,
        is_emergency: false,
    }
}

#[tokio::test]
async fn construction_runs_three_at_a_time_and_promotes() {
    let fx = Fixture::new().await;
    fx.set_stock(ResourceAmounts::uniform(dec!(1000))).await;
    let mut rx = fx.subscribe_settlement().await;

    let mut entries = Vec::new();
    for _ in 0..4 {
        entries.push(fx.engine.enqueue_construction(fx.settlement.id, farm()).await.unwrap());
    }
    let statuses: Vec<QueueStatus> = entries.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            QueueStatus::InProgress,
            QueueStatus::InProgress,
            QueueStatus::InProgress,
            QueueStatus::Queued
        ]
    );
    assert_eq!(fx.stock().await.wood, dec!(880));
    assert_eq!(kinds(&drain(&mut rx)), vec!["construction-started"; 3]);

    fx.clock.advance(TimeDelta::minutes(30));
    fx.engine.run_cadence(Cadence::ConstructionStep, 60).await.unwrap();

    let structures = fx.store.structures(fx.settlement.id).await.unwrap();
    assert_eq!(structures.len(), 3);
    assert!(structures.iter().all(|s| s.health == Some(100) && s.level == 1));

    let queue = fx.store.queue(fx.settlement.id).await.unwrap();
    let complete = queue.iter().filter(|e| e.status == QueueStatus::Complete).count();
    let running = queue.iter().filter(|e| e.status == QueueStatus::InProgress).count();
    assert_eq!((complete, running), (3, 1));

    let events = kinds(&drain(&mut rx));
    assert_eq!(
        events,
        vec![
            "construction-complete",
            "construction-complete",
            "construction-complete",
            "construction-started"
        ]
    );
}

#[tokio::test]
async fn enqueue_reports_shortfall_without_writing() {
    let fx = Fixture::new().await;
    fx.set_stock(ResourceAmounts {
        wood: dec!(10),
        ..ResourceAmounts::ZERO
    })
    .await;

    let err = fx.engine.enqueue_construction(fx.settlement.id, farm()).await.unwrap_err();
    match err {
        EngineError::Validation(EconomyError::InsufficientResources { shortfall }) => {
            assert_eq!(shortfall.wood, dec!(20));
            assert_eq!(shortfall.stone, dec!(10));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(fx.stock().await.wood, dec!(10));
    assert!(fx.store.queue(fx.settlement.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn enqueue_for_unknown_settlement_fails() {
    let fx = Fixture::new().await;
    let err = fx.engine.enqueue_construction(SettlementId::new(), farm()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn concurrent_enqueues_never_exceed_three_builds() {
    let fx = Fixture::new().await;
    fx.set_stock(ResourceAmounts::uniform(dec!(1000))).await;

    let requests = (0..6).map(|_| fx.engine.enqueue_construction(fx.settlement.id, farm()));
    let entries: Vec<ConstructionQueueEntry> = futures::future::join_all(requests)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    let started = entries.iter().filter(|e| e.status == QueueStatus::InProgress).count();
    assert_eq!(started, 3);

    let queue = fx.store.queue(fx.settlement.id).await.unwrap();
    let running = queue.iter().filter(|e| e.status == QueueStatus::InProgress).count();
    assert_eq!(running, 3);
    let positions: Vec<u32> = queue.iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5, 6]);
}

fn planned_farm(settlement_id: SettlementId, now: DateTime<Utc>) -> ConstructionQueueEntry {
    ConstructionQueueEntry {
        id: QueueEntryId::new(),
        settlement_id,
        structure_type: StructureType::Farm,
        target_level: 1,
        upgrade_of: None,
        status: QueueStatus::InProgress,
        position: 3,
        is_emergency: false,
        queued_at: now,
        started_at: Some(now),
        completes_at: Some(now + TimeDelta::minutes(30)),
        completed_at: None,
    }
}

#[tokio::test]
async fn store_decides_the_last_slot_at_write_time() {
    let fx = Fixture::new().await;
    fx.set_stock(ResourceAmounts::uniform(dec!(1000))).await;
    for _ in 0..2 {
        fx.engine.enqueue_construction(fx.settlement.id, farm()).await.unwrap();
    }

    // Both were planned while the third slot was still free.
    let now = fx.clock_now();
    let first = planned_farm(fx.settlement.id, now);
    let second = planned_farm(fx.settlement.id, now);
    let cost = ResourceAmounts::uniform(dec!(10));

    let EnqueueOutcome::Accepted(first) = fx.store.enqueue_construction(first, cost).await.unwrap() else {
        panic!("first request rejected");
    };
    let EnqueueOutcome::Accepted(second) = fx.store.enqueue_construction(second, cost).await.unwrap() else {
        panic!("second request rejected");
    };
    assert_eq!((first.status, first.position), (QueueStatus::InProgress, 3));
    assert_eq!((second.status, second.position), (QueueStatus::Queued, 4));
    assert_eq!(second.started_at, None);

    // Promotion is refused while every slot is taken.
    let promoted = ConstructionQueueEntry {
        status: QueueStatus::InProgress,
        started_at: Some(now),
        ..second
    };
    assert!(!fx.store.start_construction(promoted).await.unwrap());
    let running = fx
        .store
        .queue(fx.settlement.id)
        .await
        .unwrap()
        .iter()
        .filter(|e| e.status == QueueStatus::InProgress)
        .count();
    assert_eq!(running, 3);
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

#[tokio::test]
async fn workshop_repairs_one_point_per_hour() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Workshop, StructureCategory::Building, Some(100)).await;
    let damaged = fx.add_structure(StructureType::Farm, StructureCategory::Extractor, Some(50)).await;
    let wrecked = fx.add_structure(StructureType::Well, StructureCategory::Extractor, Some(20)).await;

    fx.engine.run_cadence(Cadence::Hourly, 216_000).await.unwrap();

    assert_eq!(fx.store.structure(damaged).await.unwrap().health, Some(51));
    assert_eq!(fx.store.structure(wrecked).await.unwrap().health, Some(20));
}

#[tokio::test]
async fn no_repair_without_workshop() {
    let fx = Fixture::new().await;
    let damaged = fx.add_structure(StructureType::Farm, StructureCategory::Extractor, Some(50)).await;

    fx.engine.run_cadence(Cadence::Hourly, 216_000).await.unwrap();

    assert_eq!(fx.store.structure(damaged).await.unwrap().health, Some(50));
}

#[tokio::test]
async fn repair_continues_past_a_failing_settlement() {
    let fx = Fixture::faulty().await;
    fx.add_structure(StructureType::Workshop, StructureCategory::Building, Some(100)).await;
    let own = fx.add_structure(StructureType::Farm, StructureCategory::Extractor, Some(50)).await;
    let neighbour = fx.add_settlement("Neighbour", fx.region, 1).await;
    fx.add_structure_to(neighbour.id, StructureType::Workshop, StructureCategory::Building, Some(100))
        .await;
    let damaged = fx
        .add_structure_to(neighbour.id, StructureType::Farm, StructureCategory::Extractor, Some(50))
        .await;
    fx.faults().break_structures_of(fx.settlement.id);

    fx.engine.run_cadence(Cadence::Hourly, 216_000).await.unwrap();

    assert_eq!(fx.store.structure(own).await.unwrap().health, Some(50));
    assert_eq!(fx.store.structure(damaged).await.unwrap().health, Some(51));
}

// ---------------------------------------------------------------------------
// Disasters
// ---------------------------------------------------------------------------

fn earthquake<S>(fx: &Fixture<S>) -> DisasterEvent {
    DisasterEvent {
        id: DisasterId::new(),
        world_id: fx.world.id,
        disaster_type: DisasterType::Earthquake,
        severity: 80,
        region_id: fx.region,
        affected_biomes: vec![Biome::Grassland],
        scheduled_at: fx.start + TimeDelta::minutes(10),
        warning_seconds: 1_800,
        impact_seconds: 3_600,
        phase: DisasterPhase::Scheduled,
        created_at: fx.start,
    }
}

#[tokio::test]
async fn disaster_runs_its_whole_lifecycle() {
    let fx = Fixture::new().await;
    fx.set_population(20).await;
    let farm_id = fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let disaster = earthquake(&fx);
    fx.store.insert_disaster(disaster.clone()).await.unwrap();
    let mut world_rx = fx.subscribe_world().await;
    let mut settlement_rx = fx.subscribe_settlement().await;

    // Inside the warning window and the imminent window at once.
    fx.engine.run_cadence(Cadence::DisasterStep, 6).await.unwrap();
    assert_eq!(fx.store.disaster(disaster.id).await.unwrap().status(), DisasterStatus::Warning);
    assert_eq!(kinds(&drain(&mut world_rx)), vec!["disaster-warning", "disaster-imminent"]);

    // Offline past the whole impact: every increment is caught up at once.
    fx.clock.advance(TimeDelta::hours(2));
    fx.engine.run_cadence(Cadence::DisasterStep, 12).await.unwrap();
    assert_eq!(fx.store.disaster(disaster.id).await.unwrap().status(), DisasterStatus::Aftermath);
    assert_eq!(
        kinds(&drain(&mut world_rx)),
        vec![
            "disaster-impact-start",
            "disaster-damage-update",
            "disaster-impact-end",
            "disaster-aftermath"
        ]
    );

    // round(80 x 0.6) = 48 damage in total.
    assert_eq!(fx.store.structure(farm_id).await.unwrap().health, Some(52));
    // Catastrophic: 15% of 20 settlers.
    let population = fx.store.population(fx.settlement.id).await.unwrap().unwrap();
    assert_eq!(population.current, 17);

    let reports = fx.store.reports(disaster.id).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].casualties, 3);
    assert_eq!(reports[0].structures_lost, 0);

    let settlement = fx.store.settlement(fx.settlement.id).await.unwrap().unwrap();
    let impact_end = fx.start + TimeDelta::minutes(70);
    assert_eq!(settlement.emergency_repair_until, Some(impact_end + TimeDelta::hours(48)));
    assert_eq!(
        kinds(&drain(&mut settlement_rx)),
        vec!["structure-damaged", "casualties-report"]
    );

    // Thirty days after impact end the disaster resolves.
    fx.clock.advance(TimeDelta::days(31));
    fx.engine.run_cadence(Cadence::DisasterStep, 18).await.unwrap();
    assert_eq!(fx.store.disaster(disaster.id).await.unwrap().status(), DisasterStatus::Resolved);
    let settlement = fx.store.settlement(fx.settlement.id).await.unwrap().unwrap();
    assert_eq!(settlement.resilience, 15);
    assert_eq!(kinds(&drain(&mut world_rx)), vec!["disaster-resolved"]);

    // Resolved disasters are no longer stepped.
    fx.clock.advance(TimeDelta::days(1));
    fx.engine.run_cadence(Cadence::DisasterStep, 24).await.unwrap();
    assert!(drain(&mut world_rx).is_empty());
}

#[tokio::test]
async fn disaster_skips_settlements_of_other_biomes() {
    let fx = Fixture::new().await;
    let farm_id = fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let mut disaster = earthquake(&fx);
    disaster.affected_biomes = vec![Biome::Mountain];
    fx.store.insert_disaster(disaster.clone()).await.unwrap();

    fx.clock.advance(TimeDelta::hours(2));
    fx.engine.run_cadence(Cadence::DisasterStep, 6).await.unwrap();

    assert_eq!(fx.store.structure(farm_id).await.unwrap().health, None);
    assert!(fx.store.reports(disaster.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn disaster_step_is_claimed_once_per_tick() {
    let fx = Fixture::new().await;
    let disaster = earthquake(&fx);
    fx.store.insert_disaster(disaster.clone()).await.unwrap();

    fx.engine.run_cadence(Cadence::DisasterStep, 6).await.unwrap();
    fx.clock.advance(TimeDelta::hours(2));
    fx.engine.run_cadence(Cadence::DisasterStep, 6).await.unwrap();

    assert_eq!(fx.store.disaster(disaster.id).await.unwrap().status(), DisasterStatus::Warning);
}

#[tokio::test]
async fn disaster_failure_in_one_settlement_spares_the_rest() {
    let fx = Fixture::faulty().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let neighbour = fx.add_settlement("Neighbour", fx.region, 20).await;
    let farm_id = fx
        .add_structure_to(neighbour.id, StructureType::Farm, StructureCategory::Extractor, None)
        .await;
    fx.faults().break_structures_of(fx.settlement.id);
    let disaster = earthquake(&fx);
    fx.store.insert_disaster(disaster.clone()).await.unwrap();
    let mut world_rx = fx.subscribe_world().await;

    fx.engine.run_cadence(Cadence::DisasterStep, 6).await.unwrap();
    fx.clock.advance(TimeDelta::hours(2));
    fx.engine.run_cadence(Cadence::DisasterStep, 12).await.unwrap();

    assert_eq!(
        kinds(&drain(&mut world_rx)),
        vec![
            "disaster-warning",
            "disaster-imminent",
            "disaster-impact-start",
            "disaster-damage-update",
            "disaster-impact-end",
            "disaster-aftermath"
        ]
    );
    assert_eq!(fx.store.structure(farm_id).await.unwrap().health, Some(52));

    let reports = fx.store.reports(disaster.id).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].settlement_id, neighbour.id);
    assert_eq!(reports[0].casualties, 3);
    let repaired_until = fx.store.settlement(neighbour.id).await.unwrap().unwrap().emergency_repair_until;
    assert!(repaired_until.is_some());

    fx.clock.advance(TimeDelta::days(31));
    fx.engine.run_cadence(Cadence::DisasterStep, 18).await.unwrap();
    assert_eq!(kinds(&drain(&mut world_rx)), vec!["disaster-resolved"]);
    assert_eq!(fx.store.settlement(neighbour.id).await.unwrap().unwrap().resilience, 15);
    assert_eq!(fx.store.settlement(fx.settlement.id).await.unwrap().unwrap().resilience, 0);
}

#[tokio::test]
async fn disasters_only_slow_production_in_their_region() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let far_region = fx.add_region("Farvale").await;
    let far = fx.add_settlement("Farstead", far_region, 1).await;
    fx.add_structure_to(far.id, StructureType::Farm, StructureCategory::Extractor, None)
        .await;
    let locusts = DisasterEvent {
        disaster_type: DisasterType::Locusts,
        phase: DisasterPhase::Impact {
            impact_started_at: fx.start,
            increments_applied: 0,
        },
        ..earthquake(&fx)
    };
    fx.store.insert_disaster(locusts).await.unwrap();

    fx.clock.advance(TimeDelta::seconds(1));
    fx.engine.run_cadence(Cadence::ResourceApply, 1).await.unwrap();

    // 6.0 food at 0.4 under the swarm, less 0.3 eaten.
    assert_eq!(fx.stock().await.food, dec!(2.1));
    let far_stock = fx.store.stock(far.id).await.unwrap().unwrap();
    assert_eq!(far_stock.amounts.food, dec!(5.7));
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transfer_is_delivered_exactly_once() {
    let fx = Fixture::new().await;
    let transfer = ResourceTransfer {
        id: TransferId::new(),
        source: SettlementId::new(),
        destination: fx.settlement.id,
        amounts: ResourceAmounts {
            food: dec!(50),
            ..ResourceAmounts::ZERO
        },
        due_at: fx.start - TimeDelta::seconds(1),
        status: TransferStatus::Pending,
        completed_at: None,
    };
    fx.store.insert_transfer(transfer.clone()).await;
    let mut rx = fx.subscribe_settlement().await;

    fx.engine.run_cadence(Cadence::TransferPoll, 600).await.unwrap();
    fx.engine.run_cadence(Cadence::TransferPoll, 1_200).await.unwrap();

    assert_eq!(fx.stock().await.food, dec!(50));
    let stored = fx.store.transfer(transfer.id).await.unwrap();
    assert_eq!(stored.status, TransferStatus::Completed);
    assert_eq!(stored.completed_at, Some(fx.start));
    assert_eq!(kinds(&drain(&mut rx)), vec!["transfer-completed"]);
}

#[tokio::test]
async fn transfer_not_yet_due_stays_pending() {
    let fx = Fixture::new().await;
    let transfer = ResourceTransfer {
        id: TransferId::new(),
        source: SettlementId::new(),
        destination: fx.settlement.id,
        amounts: ResourceAmounts::uniform(dec!(5)),
        due_at: fx.start + TimeDelta::minutes(5),
        status: TransferStatus::Pending,
        completed_at: None,
    };
    fx.store.insert_transfer(transfer.clone()).await;

    fx.engine.run_cadence(Cadence::TransferPoll, 600).await.unwrap();

    assert_eq!(fx.store.transfer(transfer.id).await.unwrap().status, TransferStatus::Pending);
    assert!(fx.stock().await.is_zero());
}

#[tokio::test]
async fn credit_landing_during_apply_is_kept() {
    let fx = Fixture::faulty().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let credit = ResourceAmounts {
        food: dec!(50),
        ..ResourceAmounts::ZERO
    };
    fx.faults().credit_before_next_write(fx.settlement.id, credit);

    fx.clock.advance(TimeDelta::seconds(1));
    fx.engine.run_cadence(Cadence::ResourceApply, 1).await.unwrap();

    let stock = fx.store.stock(fx.settlement.id).await.unwrap().unwrap();
    assert_eq!(stock.amounts.food, dec!(55.7));
    assert_eq!(stock.updated_at, fx.start + TimeDelta::seconds(1));
}

// ---------------------------------------------------------------------------
// Worlds
// ---------------------------------------------------------------------------

#[tokio::test]
async fn inactive_worlds_are_skipped() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let mut inactive = fx.world.clone();
    inactive.active = false;
    fx.store.insert_world(inactive).await;

    fx.clock.advance(TimeDelta::seconds(1));
    fx.engine.run_cadence(Cadence::ResourceApply, 1).await.unwrap();

    assert!(fx.stock().await.is_zero());
}

#[tokio::test]
async fn missing_state_skips_only_that_settlement() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    let orphan = Settlement {
        id: SettlementId::new(),
        name: String::from("Orphan"),
        ..fx.settlement.clone()
    };
    fx.store.insert_settlement(orphan).await;

    fx.clock.advance(TimeDelta::seconds(1));
    fx.engine.run_cadence(Cadence::ResourceApply, 1).await.unwrap();

    assert_eq!(fx.stock().await.food, dec!(5.7));
}

// ---------------------------------------------------------------------------
// Restart
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restarted_scheduler_resumes_above_stored_claims() {
    let fx = Fixture::new().await;
    fx.add_structure(StructureType::Farm, StructureCategory::Extractor, None).await;
    // The previous run got this far before the process stopped.
    fx.store
        .claim(fx.settlement.id.into_inner(), Cadence::ResourceApply, 5_000_000)
        .await
        .unwrap();

    let scheduler = Scheduler::resume(Arc::clone(&fx.engine)).await.unwrap();
    assert_eq!(scheduler.status().current_tick, 5_000_000);

    fx.clock.advance(TimeDelta::seconds(1));
    let fired = scheduler.advance(216_000).await;

    assert!(fired.contains(&(5_216_000, Cadence::ResourceApply)));
    assert_eq!(fx.stock().await.food, dec!(5.7));
}
