//! Resource apply and preview passes.
//!
//! Both compute the same net change since the stock was last written:
//! `ticks = elapsed_ms x rate / 1000`. The apply pass persists it and moves
//! `updated_at` forward by exactly the ticks it consumed, so sub-tick
//! remainders roll into the next pass. The preview pass only broadcasts.

use chrono::{DateTime, TimeDelta, Utc};

use holdfast_disasters::effects;
use holdfast_economy::{ModifierTotals, production, storage};
use holdfast_types::{
    Channel, DisasterEvent, EngineEvent, RegionId, ResourceAmounts, ResourceStock, Settlement, StructureCategory,
    StructureInstance, Tile, World,
};

use crate::cadence::HOUR_SECONDS;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::publish::EventPublisher;
use crate::store::SimulationStore;

/// Everything one settlement's production depends on.
struct Inputs {
    region_id: RegionId,
    stock: ResourceStock,
    tile: Tile,
    structures: Vec<StructureInstance>,
    population: u32,
    capacity: ResourceAmounts,
}

/// Whole ticks elapsed between two instants at `rate` ticks per second.
pub(crate) fn elapsed_ticks(from: DateTime<Utc>, to: DateTime<Utc>, rate: u32) -> u64 {
    let elapsed_ms = u64::try_from(to.signed_duration_since(from).num_milliseconds().max(0)).unwrap_or(0);
    elapsed_ms
        .saturating_mul(u64::from(rate))
        .checked_div(1_000)
        .unwrap_or(0)
}

/// Wall-clock span covered by `ticks` at `rate`.
pub(crate) fn ticks_span(ticks: u64, rate: u32) -> TimeDelta {
    let ms = ticks
        .saturating_mul(1_000)
        .checked_div(u64::from(rate))
        .unwrap_or(0);
    TimeDelta::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}

impl<S: SimulationStore, P: EventPublisher> Engine<S, P> {
    async fn production_inputs(&self, settlement: &Settlement) -> Result<Inputs, EngineError> {
        let missing = |what| EngineError::MissingState {
            settlement_id: settlement.id,
            what,
        };
        let stock = self.store.stock(settlement.id).await?.ok_or_else(|| missing("stock"))?;
        let tile = self
            .store
            .tile(settlement.tile_id)
            .await?
            .ok_or_else(|| missing("tile"))?;
        let population = self
            .store
            .population(settlement.id)
            .await?
            .ok_or_else(|| missing("population"))?;
        let structures = self.store.structures(settlement.id).await?;
        let modifiers = self.store.modifiers(settlement.id).await?;
        let capacity = storage::capacity(&ModifierTotals::from_aggregates(&modifiers));
        Ok(Inputs {
            region_id: settlement.region_id,
            stock,
            tile,
            structures,
            population: population.current,
            capacity,
        })
    }

    /// Net change over `ticks` for one settlement.
    fn net_change(
        &self,
        world: &World,
        disasters: &[DisasterEvent],
        inputs: &Inputs,
        ticks: u64,
        now: DateTime<Utc>,
    ) -> ResourceAmounts {
        let extractors: Vec<StructureInstance> = inputs
            .structures
            .iter()
            .filter(|s| s.category == StructureCategory::Extractor)
            .cloned()
            .collect();
        let disaster_mods = effects::combined_modifiers(
            disasters,
            inputs.region_id,
            inputs.tile.biome,
            now,
            self.config.disasters.aftermath(),
        );
        let produced = production::produce(
            &inputs.tile,
            &extractors,
            ticks,
            inputs.tile.biome,
            world.template.production_multiplier,
        )
        .saturating_mul(disaster_mods);
        let structure_count = u32::try_from(inputs.structures.len()).unwrap_or(u32::MAX);
        let consumed = production::consume_with(
            &self.config.economy.consumption,
            inputs.population,
            structure_count,
            ticks,
        );
        production::net(produced, consumed)
    }

    /// Persist production and consumption accumulated since the last write.
    ///
    /// The net change is computed from the stock as stored at write time,
    /// so a transfer credited mid-pass is kept rather than overwritten.
    pub(crate) async fn apply_resources(
        &self,
        world: &World,
        disasters: &[DisasterEvent],
        settlement: &Settlement,
        tick: u64,
    ) -> Result<(), EngineError> {
        let now = self.now();
        let rate = self.config.scheduler.tick_rate;
        let inputs = self.production_inputs(settlement).await?;

        let applied = self
            .update_stock(settlement.id, |stock| {
                let ticks = elapsed_ticks(stock.updated_at, now, rate);
                if ticks == 0 {
                    return None;
                }
                let delta = self.net_change(world, disasters, &inputs, ticks, now);
                let updated_at = stock
                    .updated_at
                    .checked_add_signed(ticks_span(ticks, rate))
                    .unwrap_or(now)
                    .min(now);
                let next = ResourceStock {
                    amounts: storage::clamp(stock.amounts, delta, inputs.capacity),
                    updated_at,
                    ..stock
                };
                Some((next, (ticks, stock.amounts, delta)))
            })
            .await?;
        let Some((ticks, before, delta)) = applied else {
            return Ok(());
        };
        let wasted = storage::waste(before, delta, inputs.capacity);
        let short = storage::shortage(before, delta);
        let after = storage::clamp(before, delta, inputs.capacity);

        tracing::debug!(
            tick,
            world_id = %world.id,
            settlement_id = %settlement.id,
            ticks,
            "Applied resources"
        );

        let channel = Channel::Settlement(settlement.id);
        self.emit(
            channel,
            EngineEvent::ResourceUpdate {
                settlement_id: settlement.id,
                tick,
                amounts: after,
                delta: after.saturating_sub(before),
            },
        )
        .await;
        if !wasted.is_zero() {
            self.emit(
                channel,
                EngineEvent::ResourceWaste {
                    settlement_id: settlement.id,
                    wasted,
                },
            )
            .await;
        }
        let near = storage::near_capacity(after, inputs.capacity);
        if !near.is_empty() {
            self.emit(
                channel,
                EngineEvent::StorageWarning {
                    settlement_id: settlement.id,
                    resources: near,
                    capacity: inputs.capacity,
                },
            )
            .await;
        }
        if !short.is_empty() {
            self.emit(
                channel,
                EngineEvent::ResourceShortage {
                    settlement_id: settlement.id,
                    resources: short,
                },
            )
            .await;
        }
        Ok(())
    }

    /// Broadcast the stock the settlement would have if applied now.
    pub(crate) async fn preview_resources(
        &self,
        world: &World,
        disasters: &[DisasterEvent],
        settlement: &Settlement,
        tick: u64,
    ) -> Result<(), EngineError> {
        let now = self.now();
        let rate = self.config.scheduler.tick_rate;
        let inputs = self.production_inputs(settlement).await?;
        let ticks = elapsed_ticks(inputs.stock.updated_at, now, rate);

        let delta = self.net_change(world, disasters, &inputs, ticks, now);
        let projected = storage::clamp(inputs.stock.amounts, delta, inputs.capacity);
        let hour_ticks = u64::from(rate).saturating_mul(HOUR_SECONDS);
        let net_per_hour = self.net_change(world, disasters, &inputs, hour_ticks, now);

        self.emit(
            Channel::Settlement(settlement.id),
            EngineEvent::ResourcePreview {
                settlement_id: settlement.id,
                tick,
                projected,
                net_per_hour,
            },
        )
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_ticks_at_sixty_hertz() {
        let start = Utc::now();
        assert_eq!(elapsed_ticks(start, start + TimeDelta::seconds(1), 60), 60);
        assert_eq!(elapsed_ticks(start, start + TimeDelta::hours(1), 60), 216_000);
        assert_eq!(elapsed_ticks(start, start + TimeDelta::milliseconds(10), 60), 0);
        assert_eq!(elapsed_ticks(start + TimeDelta::seconds(5), start, 60), 0);
    }

    #[test]
    fn span_inverts_ticks() {
        assert_eq!(ticks_span(60, 60), TimeDelta::seconds(1));
        assert_eq!(ticks_span(216_000, 60), TimeDelta::hours(1));
        assert_eq!(ticks_span(10, 0), TimeDelta::zero());
    }
}
