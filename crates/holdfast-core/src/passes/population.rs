//! Population pass: growth, migration, and warnings for one settlement.

use holdfast_economy::population::{self, EMIGRATION_THRESHOLD};
use holdfast_economy::{ModifierTotals, Sufficiency, production};
use holdfast_types::{Channel, EngineEvent, PopulationState, PopulationWarningReason, Settlement};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::passes::production::elapsed_ticks;
use crate::publish::EventPublisher;
use crate::store::SimulationStore;

impl<S: SimulationStore, P: EventPublisher> Engine<S, P> {
    /// Advance one settlement's population.
    pub(crate) async fn update_population(&self, settlement: &Settlement, tick: u64) -> Result<(), EngineError> {
        let now = self.now();
        let state = self
            .store
            .population(settlement.id)
            .await?
            .ok_or(EngineError::MissingState {
                settlement_id: settlement.id,
                what: "population",
            })?;
        let stock = self.store.stock(settlement.id).await?.ok_or(EngineError::MissingState {
            settlement_id: settlement.id,
            what: "stock",
        })?;
        let modifiers = ModifierTotals::from_aggregates(&self.store.modifiers(settlement.id).await?);

        let capacity = population::capacity(&modifiers);
        let happiness = population::happiness(&modifiers);
        // What the current settlers eat and drink over the window being
        // evaluated.
        let window = elapsed_ticks(state.updated_at, now, self.config.scheduler.tick_rate);
        let needed = production::consume_with(&self.config.economy.consumption, state.current, 0, window);
        let sufficiency = Sufficiency::over_window(stock.amounts, needed);
        let elapsed_ms = u64::try_from(now.signed_duration_since(state.updated_at).num_milliseconds().max(0))
            .unwrap_or(0);

        let growth = population::step(
            state.current,
            capacity,
            happiness,
            sufficiency,
            elapsed_ms,
            state.growth_carry,
        );
        let migration = self.with_rng(|rng| {
            population::sample_migration(rng, growth.population, capacity, happiness)
        });
        let current = population::finalize(growth.population, migration, capacity);

        self.store
            .save_population(PopulationState {
                settlement_id: settlement.id,
                current,
                happiness,
                last_growth_tick: tick,
                growth_carry: growth.carry,
                updated_at: now,
            })
            .await?;

        tracing::debug!(
            tick,
            settlement_id = %settlement.id,
            previous = state.current,
            current,
            capacity,
            happiness,
            "Population updated"
        );

        let channel = Channel::Settlement(settlement.id);
        if growth.population != state.current {
            self.emit(
                channel,
                EngineEvent::PopulationGrowth {
                    settlement_id: settlement.id,
                    previous: state.current,
                    current: growth.population,
                    capacity,
                },
            )
            .await;
        }
        if migration.immigrants > 0 {
            self.emit(
                channel,
                EngineEvent::SettlerArrived {
                    settlement_id: settlement.id,
                    count: migration.immigrants,
                    population: current,
                },
            )
            .await;
        }
        if migration.emigrants > 0 {
            self.emit(
                channel,
                EngineEvent::SettlersDeparted {
                    settlement_id: settlement.id,
                    count: migration.emigrants,
                    population: current,
                },
            )
            .await;
        }

        let mut reasons = Vec::new();
        if happiness < EMIGRATION_THRESHOLD {
            reasons.push(PopulationWarningReason::LowHappiness);
        }
        if !sufficiency.food {
            reasons.push(PopulationWarningReason::FoodShortage);
        }
        if !sufficiency.water {
            reasons.push(PopulationWarningReason::WaterShortage);
        }
        if !reasons.is_empty() {
            self.emit(
                channel,
                EngineEvent::PopulationWarning {
                    settlement_id: settlement.id,
                    reasons,
                    happiness,
                },
            )
            .await;
        }

        self.emit(
            channel,
            EngineEvent::PopulationState {
                settlement_id: settlement.id,
                current,
                capacity,
                happiness,
            },
        )
        .await;
        Ok(())
    }
}
