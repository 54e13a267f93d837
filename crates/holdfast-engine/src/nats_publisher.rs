//! NATS fan-out for engine events.
//!
//! [`NatsPublisher`] implements [`EventPublisher`] by publishing each event
//! as JSON on `holdfast.{channel}`, e.g. `holdfast.world.{world_id}` or
//! `holdfast.settlement.{settlement_id}`. Gateway processes subscribe to the
//! subjects their connected clients care about.
//!
//! Core NATS does not report subscriber interest, so every event is handed
//! to the server and the outcome is always [`PublishOutcome::Published`].
//! The server discards messages nobody is subscribed to.

use holdfast_core::{EventPublisher, PublishError, PublishOutcome};
use holdfast_types::{Channel, EngineEvent};
use tracing::debug;

/// Subject prefix for every engine event.
pub const SUBJECT_PREFIX: &str = "holdfast";

/// Publishes engine events to NATS.
#[derive(Debug, Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns the connection error message if the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, String> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| format!("failed to connect to NATS at {url}: {e}"))?;
        Ok(Self { client })
    }

    /// Flush buffered messages to the server.
    pub async fn flush(&self) -> Result<(), PublishError> {
        self.client
            .flush()
            .await
            .map_err(|e| PublishError::Transport(Box::new(e)))
    }
}

/// NATS subject for a channel.
pub fn subject(channel: Channel) -> String {
    format!("{SUBJECT_PREFIX}.{channel}")
}

impl EventPublisher for NatsPublisher {
    async fn publish_if_subscribed(
        &self,
        channel: Channel,
        event: &EngineEvent,
    ) -> Result<PublishOutcome, PublishError> {
        let payload = serde_json::to_vec(event).map_err(|e| PublishError::Encode(e.to_string()))?;
        let subject = subject(channel);
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| PublishError::Transport(Box::new(e)))?;
        debug!(subject = %subject, "Published event");
        Ok(PublishOutcome::Published)
    }
}

#[cfg(test)]
mod tests {
    use holdfast_types::{SettlementId, WorldId};

    use super::*;

    #[test]
    fn subjects_are_prefixed_channels() {
        let world = WorldId::new();
        let settlement = SettlementId::new();
        assert_eq!(subject(Channel::World(world)), format!("holdfast.world.{world}"));
        assert_eq!(
            subject(Channel::Settlement(settlement)),
            format!("holdfast.settlement.{settlement}")
        );
    }
}
