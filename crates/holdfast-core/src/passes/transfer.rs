//! Delivery of in-transit resource transfers.

use tracing::{debug, info};

use holdfast_economy::{ModifierTotals, storage};
use holdfast_types::{Channel, EngineEvent, ResourceTransfer};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::publish::EventPublisher;
use crate::store::SimulationStore;

impl<S: SimulationStore, P: EventPublisher> Engine<S, P> {
    /// Deliver every pending transfer that has arrived.
    ///
    /// Each transfer completes at most once even when several instances
    /// poll concurrently: the store only credits a transfer it moved out of
    /// the pending state itself.
    pub(crate) async fn poll_transfers(&self, tick: u64) -> Result<(), EngineError> {
        let now = self.now();
        for transfer in self.store.due_transfers(now).await? {
            if let Err(err) = self.deliver(&transfer, tick).await {
                tracing::error!(tick, transfer_id = %transfer.id, error = %err, "Transfer delivery failed");
            }
        }
        Ok(())
    }

    async fn deliver(&self, transfer: &ResourceTransfer, tick: u64) -> Result<(), EngineError> {
        let modifiers = self.store.modifiers(transfer.destination).await?;
        let capacity = storage::capacity(&ModifierTotals::from_aggregates(&modifiers));

        let Some(delivered) = self
            .store
            .complete_transfer(transfer.id, self.now(), capacity)
            .await?
        else {
            debug!(tick, transfer_id = %transfer.id, "Transfer already delivered");
            return Ok(());
        };

        info!(
            tick,
            transfer_id = %transfer.id,
            source = %transfer.source,
            destination = %transfer.destination,
            "Transfer delivered"
        );
        let event = EngineEvent::TransferCompleted {
            transfer_id: transfer.id,
            source: transfer.source,
            destination: transfer.destination,
            delivered,
        };
        self.emit(Channel::Settlement(transfer.source), event.clone()).await;
        self.emit(Channel::Settlement(transfer.destination), event).await;
        Ok(())
    }
}
