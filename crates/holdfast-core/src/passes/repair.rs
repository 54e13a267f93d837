//! Hourly passive repair.

use holdfast_economy::repair;
use holdfast_types::{Settlement, World};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::publish::EventPublisher;
use crate::store::SimulationStore;

impl<S: SimulationStore, P: EventPublisher> Engine<S, P> {
    /// Heal damaged structures of one settlement if it has a standing
    /// Workshop.
    pub(crate) async fn repair_settlement(
        &self,
        world: &World,
        settlement: &Settlement,
        tick: u64,
    ) -> Result<(), EngineError> {
        let points = self.config.economy.repair_points_per_hour;
        let structures = self.store.structures(settlement.id).await?;
        let repairs = repair::repair_pass(&structures, points);
        for r in &repairs {
            self.store.set_structure_health(r.structure_id, r.to).await?;
        }
        if !repairs.is_empty() {
            tracing::debug!(
                tick,
                world_id = %world.id,
                settlement_id = %settlement.id,
                repaired = repairs.len(),
                "Passive repair applied"
            );
        }
        Ok(())
    }
}
