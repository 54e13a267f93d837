//! Modifier cache refresh.

use holdfast_economy::modifiers;
use holdfast_types::{ModifierAggregate, SettlementId};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::publish::EventPublisher;
use crate::store::SimulationStore;

impl<S: SimulationStore, P: EventPublisher> Engine<S, P> {
    /// Recompute a settlement's modifier aggregates from its structures and
    /// replace the cached rows.
    ///
    /// Call after any structure is created, upgraded, destroyed, or deleted.
    /// Kinds no longer produced disappear; a settlement with no standing
    /// structures ends up with no rows.
    pub async fn refresh_modifiers(&self, settlement_id: SettlementId) -> Result<Vec<ModifierAggregate>, EngineError> {
        let structures = self.store.structures(settlement_id).await?;
        let aggregates = modifiers::aggregate(settlement_id, &structures);
        self.store
            .replace_modifiers(settlement_id, aggregates.clone())
            .await?;
        tracing::debug!(
            settlement_id = %settlement_id,
            kinds = aggregates.len(),
            "Refreshed modifiers"
        );
        Ok(aggregates)
    }
}
