//! Cadence dispatch and per-entity fan-out.
//!
//! [`Engine`] owns the store, the publisher, the clock, and the random
//! source. The scheduler hands it one fired [`Cadence`] at a time through
//! [`Engine::run_cadence`]; the engine walks every active world and fans the
//! work out per settlement (bounded by `scheduler.batch_size`) or per
//! disaster. The passes themselves live in [`crate::passes`].
//!
//! Failures are contained to the unit that raised them. A missing row is
//! logged at `warn` and the unit skipped; a store or publish failure is
//! logged at `error`. Neither stops siblings or the cadence.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, warn};

use holdfast_types::{Channel, DisasterEvent, EngineEvent, ResourceStock, Settlement, SettlementId, World};

use crate::cadence::Cadence;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::publish::{EventPublisher, PublishOutcome};
use crate::store::SimulationStore;

/// Read-modify-write attempts on one stock row before giving up.
const STOCK_WRITE_ATTEMPTS: u32 = 3;

/// The simulation engine.
pub struct Engine<S, P> {
    pub(crate) store: Arc<S>,
    pub(crate) publisher: Arc<P>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: EngineConfig,
    rng: Mutex<StdRng>,
}

impl<S, P> core::fmt::Debug for Engine<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("now", &self.clock.now())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: SimulationStore, P: EventPublisher> Engine<S, P> {
    /// Create an engine.
    ///
    /// Random rolls are seeded from `config.scheduler.seed` when set and
    /// from the OS otherwise.
    pub fn new(store: Arc<S>, publisher: Arc<P>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let rng = config
            .scheduler
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            store,
            publisher,
            clock,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The backing store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The event publisher.
    pub const fn publisher(&self) -> &Arc<P> {
        &self.publisher
    }

    /// Current wall-clock time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `f` with the engine's random source.
    ///
    /// The lock is never held across an await.
    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Publish an event, logging instead of failing.
    pub(crate) async fn emit(&self, channel: Channel, event: EngineEvent) {
        match self.publisher.publish_if_subscribed(channel, &event).await {
            Ok(PublishOutcome::Published) => {
                debug!(channel = %channel, event = event.kind(), "Published event");
            }
            Ok(PublishOutcome::NoSubscribers) => {}
            Err(err) => {
                error!(channel = %channel, event = event.kind(), error = %err, "Failed to publish event");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Run one fired cadence across every active world.
    ///
    /// # Errors
    ///
    /// Returns an error only when the world list itself cannot be loaded.
    /// Failures inside a world, settlement, or disaster are logged and
    /// skipped.
    pub async fn run_cadence(&self, cadence: Cadence, tick: u64) -> Result<(), EngineError> {
        if cadence == Cadence::TransferPoll {
            return self.poll_transfers(tick).await;
        }

        let worlds = self.store.active_worlds().await?;
        for world in &worlds {
            let result = match cadence {
                Cadence::DisasterStep => self.step_disasters(world, tick).await,
                Cadence::Hourly => self.run_hourly(world, tick).await,
                Cadence::ConstructionStep
                | Cadence::ResourcePreview
                | Cadence::ResourceApply
                | Cadence::Population => self.for_each_settlement(world, cadence, tick).await,
                Cadence::TransferPoll => Ok(()),
            };
            if let Err(err) = result {
                error!(
                    tick,
                    world_id = %world.id,
                    cadence = %cadence,
                    error = %err,
                    "World pass failed"
                );
            }
        }
        Ok(())
    }

    /// Hourly work for one world: disaster creation, then passive repair
    /// fanned out per settlement.
    async fn run_hourly(&self, world: &World, tick: u64) -> Result<(), EngineError> {
        if let Err(err) = self.roll_disasters(world, tick).await {
            error!(tick, world_id = %world.id, error = %err, "Disaster roll failed");
        }
        self.for_each_settlement(world, Cadence::Hourly, tick).await
    }

    /// Fan a settlement cadence out over a world's settlements.
    async fn for_each_settlement(&self, world: &World, cadence: Cadence, tick: u64) -> Result<(), EngineError> {
        let settlements = self.store.settlements(world.id).await?;
        let disasters = match cadence {
            Cadence::ResourceApply | Cadence::ResourcePreview => self.store.active_disasters(world.id).await?,
            _ => Vec::new(),
        };
        let disasters = disasters.as_slice();

        futures::stream::iter(settlements)
            .for_each_concurrent(self.config.scheduler.batch_size, |settlement| {
                self.process_settlement(world, disasters, cadence, tick, settlement)
            })
            .await;
        Ok(())
    }

    async fn process_settlement(
        &self,
        world: &World,
        disasters: &[DisasterEvent],
        cadence: Cadence,
        tick: u64,
        settlement: Settlement,
    ) {
        // Previews are read-only and need no claim.
        if cadence != Cadence::ResourcePreview && !self.claim(settlement.id.into_inner(), cadence, tick).await {
            return;
        }

        let result = match cadence {
            Cadence::ResourceApply => self.apply_resources(world, disasters, &settlement, tick).await,
            Cadence::ResourcePreview => self.preview_resources(world, disasters, &settlement, tick).await,
            Cadence::Population => self.update_population(&settlement, tick).await,
            Cadence::ConstructionStep => self.step_construction(&settlement, tick).await,
            Cadence::Hourly => self.repair_settlement(world, &settlement, tick).await,
            Cadence::DisasterStep | Cadence::TransferPoll => Ok(()),
        };
        if let Err(err) = result {
            log_unit_failure(&err, tick, cadence, world, &settlement);
        }
    }

    /// Rewrite a settlement's stock from its current value.
    ///
    /// `change` maps the stored stock to its replacement plus a result, or
    /// to `None` to leave it untouched. The write only lands if nobody
    /// changed the row since it was read; otherwise the row is read again
    /// and `change` re-run, so concurrent credits are never overwritten.
    pub(crate) async fn update_stock<T: Send>(
        &self,
        settlement_id: SettlementId,
        mut change: impl FnMut(ResourceStock) -> Option<(ResourceStock, T)> + Send,
    ) -> Result<Option<T>, EngineError> {
        for attempt in 1..=STOCK_WRITE_ATTEMPTS {
            let current = self
                .store
                .stock(settlement_id)
                .await?
                .ok_or(EngineError::MissingState {
                    settlement_id,
                    what: "stock",
                })?;
            let Some((next, outcome)) = change(current) else {
                return Ok(None);
            };
            if self.store.replace_stock(current, next).await? {
                return Ok(Some(outcome));
            }
            debug!(settlement_id = %settlement_id, attempt, "Stock changed underneath, retrying");
        }
        Err(EngineError::StockContention(settlement_id))
    }

    /// Claim an entity for this tick, logging failures.
    pub(crate) async fn claim(&self, entity: uuid::Uuid, cadence: Cadence, tick: u64) -> bool {
        match self.store.claim(entity, cadence, tick).await {
            Ok(true) => true,
            Ok(false) => {
                debug!(tick, cadence = %cadence, entity = %entity, "Already claimed, skipping");
                false
            }
            Err(err) => {
                error!(tick, cadence = %cadence, entity = %entity, error = %err, "Claim failed");
                false
            }
        }
    }
}

fn log_unit_failure(err: &EngineError, tick: u64, cadence: Cadence, world: &World, settlement: &Settlement) {
    if err.is_not_found() {
        warn!(
            tick,
            world_id = %world.id,
            settlement_id = %settlement.id,
            cadence = %cadence,
            error = %err,
            "Skipping settlement"
        );
    } else {
        error!(
            tick,
            world_id = %world.id,
            settlement_id = %settlement.id,
            cadence = %cadence,
            error = %err,
            "Settlement pass failed"
        );
    }
}
