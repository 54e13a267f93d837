//! Disaster creation and lifecycle stepping.
//!
//! Each step advances one disaster to the current time, persists the new
//! phase, and only then applies the side effects of every transition it
//! passed through. A crash between the two loses side effects rather than
//! repeating them: damage is never dealt twice.
//!
//! Once the phase is saved, a failure touching one settlement is logged and
//! that settlement skipped. The other settlements still take their damage,
//! reports, and resilience, and the world still hears every transition.

use tracing::{error, info, warn};

use holdfast_disasters::lifecycle::{self, Transition};
use holdfast_disasters::{catalog, damage, scheduling};
use holdfast_economy::modifiers::is_standing;
use holdfast_types::{
    Channel, DisasterEvent, DisasterReport, EngineEvent, PopulationState, ResourceAmounts, ResourceStock,
    Settlement, SettlementId, World,
};

use crate::cadence::Cadence;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::publish::EventPublisher;
use crate::store::SimulationStore;

/// Percentage of `done` out of `total`, saturating at 100.
fn progress_percent(done: u32, total: u32) -> u8 {
    let pct = u64::from(done)
        .saturating_mul(100)
        .checked_div(u64::from(total))
        .unwrap_or(100)
        .min(100);
    u8::try_from(pct).unwrap_or(100)
}

fn log_settlement_failure(err: &EngineError, disaster: &DisasterEvent, settlement_id: SettlementId, step: &str) {
    if err.is_not_found() {
        warn!(
            disaster_id = %disaster.id,
            settlement_id = %settlement_id,
            step,
            error = %err,
            "Skipping settlement for disaster"
        );
    } else {
        error!(
            disaster_id = %disaster.id,
            settlement_id = %settlement_id,
            step,
            error = %err,
            "Disaster effect failed for settlement"
        );
    }
}

impl<S: SimulationStore, P: EventPublisher> Engine<S, P> {
    /// Advance every unresolved disaster of a world.
    pub(crate) async fn step_disasters(&self, world: &World, tick: u64) -> Result<(), EngineError> {
        let disasters = self.store.active_disasters(world.id).await?;
        for disaster in disasters {
            if !self.claim(disaster.id.into_inner(), Cadence::DisasterStep, tick).await {
                continue;
            }
            if let Err(err) = self.step_disaster(world, &disaster, tick).await {
                warn!(
                    tick,
                    world_id = %world.id,
                    disaster_id = %disaster.id,
                    error = %err,
                    "Disaster step failed"
                );
            }
        }
        Ok(())
    }

    async fn step_disaster(&self, world: &World, disaster: &DisasterEvent, tick: u64) -> Result<(), EngineError> {
        let now = self.now();
        let advance = lifecycle::advance(disaster, now, &self.config.disasters)?;
        if advance.is_empty() {
            return Ok(());
        }

        // Targets are resolved before the phase moves, so failing here
        // leaves the disaster to be stepped again.
        let needs_targets = advance
            .transitions
            .iter()
            .any(|t| matches!(t, Transition::Damage { .. } | Transition::ImpactEnded { .. }));
        let targets = if needs_targets {
            self.affected_settlements(world, disaster).await?
        } else {
            Vec::new()
        };

        let mut updated = disaster.clone();
        updated.phase = advance.phase;
        self.store.save_disaster(updated).await?;
        info!(
            tick,
            world_id = %world.id,
            disaster_id = %disaster.id,
            from = ?disaster.status(),
            to = ?advance.phase.status(),
            "Disaster advanced"
        );

        let channel = Channel::World(world.id);
        for transition in advance.transitions {
            match transition {
                Transition::WarningIssued => {
                    self.emit(
                        channel,
                        EngineEvent::DisasterWarning {
                            disaster_id: disaster.id,
                            region_id: disaster.region_id,
                            disaster_type: disaster.disaster_type,
                            severity_level: disaster.severity_level(),
                            affected_biomes: disaster.affected_biomes.clone(),
                            impact_at: disaster.scheduled_at,
                        },
                    )
                    .await;
                }
                Transition::ImminentNotified => {
                    self.emit(
                        channel,
                        EngineEvent::DisasterImminent {
                            disaster_id: disaster.id,
                            disaster_type: disaster.disaster_type,
                            impact_at: disaster.scheduled_at,
                        },
                    )
                    .await;
                }
                Transition::ImpactStarted { ends_at } => {
                    self.emit(
                        channel,
                        EngineEvent::DisasterImpactStart {
                            disaster_id: disaster.id,
                            disaster_type: disaster.disaster_type,
                            severity: disaster.severity,
                            impact_ends_at: ends_at,
                        },
                    )
                    .await;
                }
                Transition::Damage { from, to, total } => {
                    self.deal_damage(disaster, &targets, from, to, total).await;
                    self.emit(
                        channel,
                        EngineEvent::DisasterDamageUpdate {
                            disaster_id: disaster.id,
                            increments_applied: to,
                            total_increments: total,
                            progress_percent: progress_percent(to, total),
                        },
                    )
                    .await;
                }
                Transition::ImpactEnded {
                    ended_at,
                    aftermath_ends_at,
                } => {
                    let until = ended_at
                        .checked_add_signed(self.config.disasters.emergency_repair())
                        .unwrap_or(ended_at);
                    for settlement in &targets {
                        if let Err(err) = self.report_losses(disaster, settlement, until).await {
                            log_settlement_failure(&err, disaster, settlement.id, "report");
                        }
                    }
                    self.emit(
                        channel,
                        EngineEvent::DisasterImpactEnd {
                            disaster_id: disaster.id,
                            disaster_type: disaster.disaster_type,
                        },
                    )
                    .await;
                    self.emit(
                        channel,
                        EngineEvent::DisasterAftermath {
                            disaster_id: disaster.id,
                            aftermath_ends_at,
                        },
                    )
                    .await;
                }
                Transition::Resolved => {
                    let bonus = catalog::resilience_bonus(disaster.severity_level());
                    let reports = self.store.reports(disaster.id).await.unwrap_or_else(|err| {
                        error!(disaster_id = %disaster.id, error = %err, "Failed to load disaster reports");
                        Vec::new()
                    });
                    for report in reports {
                        if let Err(err) = self.store.add_resilience(report.settlement_id, bonus).await {
                            let err = EngineError::from(err);
                            log_settlement_failure(&err, disaster, report.settlement_id, "resilience");
                        }
                    }
                    self.emit(
                        channel,
                        EngineEvent::DisasterResolved {
                            disaster_id: disaster.id,
                            resilience_bonus: bonus,
                        },
                    )
                    .await;
                }
            }
        }
        Ok(())
    }

    /// Settlements in the disaster's region whose tile biome it affects.
    async fn affected_settlements(
        &self,
        world: &World,
        disaster: &DisasterEvent,
    ) -> Result<Vec<Settlement>, EngineError> {
        let mut affected = Vec::new();
        for settlement in self.store.settlements(world.id).await? {
            if settlement.region_id != disaster.region_id {
                continue;
            }
            match self.store.tile(settlement.tile_id).await {
                Ok(Some(tile)) if disaster.affects(tile.biome) => affected.push(settlement),
                Ok(Some(_)) => {}
                Ok(None) => {
                    warn!(settlement_id = %settlement.id, tile_id = %settlement.tile_id, "Settlement tile missing");
                }
                Err(err) => {
                    log_settlement_failure(&EngineError::from(err), disaster, settlement.id, "tile");
                }
            }
        }
        Ok(affected)
    }

    /// Apply damage increments `from + 1 ..= to` to every standing structure.
    async fn deal_damage(&self, disaster: &DisasterEvent, targets: &[Settlement], from: u32, to: u32, total: u32) {
        let full = damage::total_damage(disaster.severity, disaster.disaster_type);
        let dealt = damage::damage_between(full, from, to, total);
        if dealt == 0 {
            return;
        }
        for settlement in targets {
            if let Err(err) = self.damage_settlement(disaster, settlement, dealt).await {
                log_settlement_failure(&err, disaster, settlement.id, "damage");
            }
        }
    }

    async fn damage_settlement(
        &self,
        disaster: &DisasterEvent,
        settlement: &Settlement,
        dealt: u8,
    ) -> Result<(), EngineError> {
        let mut events = Vec::new();
        let mut destroyed = false;
        for structure in self.store.structures(settlement.id).await? {
            if !is_standing(&structure) {
                continue;
            }
            let health = damage::apply_damage(structure.health, dealt);
            self.store.set_structure_health(structure.id, health).await?;
            destroyed |= health == 0;
            events.push(EngineEvent::StructureDamaged {
                disaster_id: disaster.id,
                settlement_id: settlement.id,
                structure_id: structure.id,
                structure_type: structure.structure_type,
                damage: dealt,
                health,
            });
        }
        if destroyed {
            self.refresh_modifiers(settlement.id).await?;
        }
        for event in events {
            self.emit(Channel::Settlement(settlement.id), event).await;
        }
        Ok(())
    }

    /// Casualties, destroyed structures, and lost stock for one settlement.
    async fn report_losses(
        &self,
        disaster: &DisasterEvent,
        settlement: &Settlement,
        emergency_repair_until: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), EngineError> {
        let level = disaster.severity_level();
        let missing = |what| EngineError::MissingState {
            settlement_id: settlement.id,
            what,
        };

        let population = self
            .store
            .population(settlement.id)
            .await?
            .ok_or_else(|| missing("population"))?;
        let casualties = damage::casualties(population.current, level);
        if casualties > 0 {
            self.store
                .save_population(PopulationState {
                    current: population.current.saturating_sub(casualties),
                    ..population
                })
                .await?;
        }

        let resource_losses = self
            .update_stock(settlement.id, |stock| {
                let losses = damage::resource_losses(stock.amounts, disaster.disaster_type, level);
                let next = ResourceStock {
                    amounts: stock.amounts.saturating_sub(losses),
                    ..stock
                };
                Some((next, losses))
            })
            .await?
            .unwrap_or(ResourceAmounts::ZERO);

        let structures_lost = self
            .store
            .structures(settlement.id)
            .await?
            .iter()
            .filter(|s| !is_standing(s))
            .count();
        let structures_lost = u32::try_from(structures_lost).unwrap_or(u32::MAX);

        self.store
            .save_report(DisasterReport {
                disaster_id: disaster.id,
                settlement_id: settlement.id,
                casualties,
                structures_lost,
                resource_losses,
            })
            .await?;
        self.store
            .set_emergency_repair(settlement.id, emergency_repair_until)
            .await?;

        info!(
            disaster_id = %disaster.id,
            settlement_id = %settlement.id,
            casualties,
            structures_lost,
            "Disaster losses recorded"
        );
        self.emit(
            Channel::Settlement(settlement.id),
            EngineEvent::CasualtiesReport {
                disaster_id: disaster.id,
                settlement_id: settlement.id,
                casualties,
                structures_lost,
                resource_losses,
                emergency_repair_until,
            },
        )
        .await;
        Ok(())
    }

    /// Roll for new disasters in every region of a world.
    pub(crate) async fn roll_disasters(&self, world: &World, tick: u64) -> Result<(), EngineError> {
        if !self.claim(world.id.into_inner(), Cadence::Hourly, tick).await {
            return Ok(());
        }
        let now = self.now();
        for region in self.store.regions(world.id).await? {
            let rolled = self.with_rng(|rng| scheduling::roll_for_region(rng, world, &region, now));
            match rolled {
                Ok(Some(disaster)) => {
                    info!(
                        tick,
                        world_id = %world.id,
                        region_id = %region.id,
                        disaster_id = %disaster.id,
                        disaster_type = ?disaster.disaster_type,
                        severity = disaster.severity,
                        scheduled_at = %disaster.scheduled_at,
                        "Disaster scheduled"
                    );
                    self.store.insert_disaster(disaster).await?;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(tick, world_id = %world.id, region_id = %region.id, error = %err, "Disaster roll skipped");
                }
            }
        }
        Ok(())
    }
}
