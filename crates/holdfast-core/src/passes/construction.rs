//! Construction enqueue and the per-minute queue step.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use holdfast_economy::construction::{self, BuildRequest};
use holdfast_types::{
    Channel, ConstructionQueueEntry, EngineEvent, QueueStatus, Settlement, SettlementId,
};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::publish::EventPublisher;
use crate::store::{EnqueueOutcome, SimulationStore};

fn started_event(entry: &ConstructionQueueEntry, now: DateTime<Utc>) -> EngineEvent {
    EngineEvent::ConstructionStarted {
        settlement_id: entry.settlement_id,
        entry_id: entry.id,
        structure_type: entry.structure_type,
        target_level: entry.target_level,
        completes_at: entry.completes_at.unwrap_or(now),
    }
}

impl<S: SimulationStore, P: EventPublisher> Engine<S, P> {
    /// Validate a build request, deduct its cost, and queue it.
    ///
    /// The entry starts immediately when fewer than three builds are in
    /// progress. Nothing is written when validation fails.
    ///
    /// # Errors
    ///
    /// - [`EngineError::SettlementNotFound`] for an unknown settlement.
    /// - [`EngineError::Validation`] for a bad level, upgrade target, or
    ///   insufficient resources (with the shortfall).
    /// - [`EngineError::Unaffordable`] if stock dropped below the cost
    ///   between validation and deduction.
    pub async fn enqueue_construction(
        &self,
        settlement_id: SettlementId,
        request: BuildRequest,
    ) -> Result<ConstructionQueueEntry, EngineError> {
        let now = self.now();
        self.store
            .settlement(settlement_id)
            .await?
            .ok_or(EngineError::SettlementNotFound(settlement_id))?;
        let stock = self.store.stock(settlement_id).await?.ok_or(EngineError::MissingState {
            settlement_id,
            what: "stock",
        })?;
        let structures = self.store.structures(settlement_id).await?;
        let queue = self.store.queue(settlement_id).await?;

        let plan = construction::plan_enqueue(settlement_id, &request, &structures, &queue, stock.amounts, now)?;

        let entry = match self.store.enqueue_construction(plan.entry, plan.cost).await? {
            EnqueueOutcome::Accepted(stored) => stored,
            EnqueueOutcome::Unaffordable => {
                let current = self
                    .store
                    .stock(settlement_id)
                    .await?
                    .map_or(stock.amounts, |s| s.amounts);
                return Err(EngineError::Unaffordable {
                    settlement_id,
                    shortfall: Box::new(construction::shortfall(plan.cost, current)),
                });
            }
        };

        info!(
            settlement_id = %settlement_id,
            entry_id = %entry.id,
            structure_type = ?entry.structure_type,
            target_level = entry.target_level,
            emergency = entry.is_emergency,
            status = ?entry.status,
            "Construction queued"
        );
        if entry.status == QueueStatus::InProgress {
            self.emit(Channel::Settlement(settlement_id), started_event(&entry, now))
                .await;
        }
        Ok(entry)
    }

    /// Complete due builds and fill free slots for one settlement.
    pub(crate) async fn step_construction(&self, settlement: &Settlement, tick: u64) -> Result<(), EngineError> {
        let now = self.now();
        let queue = self.store.queue(settlement.id).await?;
        let step = construction::step(&queue, now);
        if step.is_empty() {
            return Ok(());
        }

        let mut structures = self.store.structures(settlement.id).await?;
        let mut events = Vec::new();

        for entry in step.completed {
            match construction::complete(&entry, &structures, now) {
                Ok(structure) => {
                    self.store
                        .complete_construction(entry.clone(), structure.clone())
                        .await?;
                    info!(
                        tick,
                        settlement_id = %settlement.id,
                        entry_id = %entry.id,
                        structure_id = %structure.id,
                        structure_type = ?structure.structure_type,
                        level = structure.level,
                        "Construction complete"
                    );
                    events.push(EngineEvent::ConstructionComplete {
                        settlement_id: settlement.id,
                        entry_id: entry.id,
                        structure_id: structure.id,
                        structure_type: structure.structure_type,
                        level: structure.level,
                    });
                    structures.retain(|s| s.id != structure.id);
                    structures.push(structure);
                }
                Err(err) => {
                    // The upgrade target was removed while the build ran.
                    warn!(
                        tick,
                        settlement_id = %settlement.id,
                        entry_id = %entry.id,
                        error = %err,
                        "Closing construction without a structure"
                    );
                    self.store.save_queue_entry(entry).await?;
                }
            }
        }
        if !events.is_empty() {
            self.refresh_modifiers(settlement.id).await?;
        }

        for entry in step.started {
            if !self.store.start_construction(entry.clone()).await? {
                debug!(
                    tick,
                    settlement_id = %settlement.id,
                    entry_id = %entry.id,
                    "Build slot already taken"
                );
                continue;
            }
            info!(
                tick,
                settlement_id = %settlement.id,
                entry_id = %entry.id,
                structure_type = ?entry.structure_type,
                "Construction started"
            );
            events.push(started_event(&entry, now));
        }

        let channel = Channel::Settlement(settlement.id);
        for event in events {
            self.emit(channel, event).await;
        }
        Ok(())
    }
}
