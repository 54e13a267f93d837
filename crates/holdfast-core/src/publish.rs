//! Event fan-out seam.
//!
//! The engine never asks who is listening. It hands every event to an
//! [`EventPublisher`], which drops it when the channel has no subscribers.
//! [`BroadcastPublisher`] keeps one tokio `broadcast` channel per
//! [`Channel`] for in-process consumers and tests. A channel whose last
//! receiver is gone is dropped the next time it is published to or anyone
//! subscribes, so settlements nobody watches any more do not pile up.

use std::collections::BTreeMap;
use std::future::Future;

use tokio::sync::{RwLock, broadcast};

use holdfast_types::{Channel, EngineEvent};

use crate::error::PublishError;

/// Default per-channel buffer of [`BroadcastPublisher`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// What happened to a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// At least one subscriber was handed the event.
    Published,
    /// Nobody was listening; the event was dropped.
    NoSubscribers,
}

/// Delivers engine events to subscribers.
pub trait EventPublisher: Send + Sync + 'static {
    /// Publish `event` on `channel` if anyone is subscribed.
    fn publish_if_subscribed(
        &self,
        channel: Channel,
        event: &EngineEvent,
    ) -> impl Future<Output = Result<PublishOutcome, PublishError>> + Send;
}

/// In-process publisher backed by tokio broadcast channels.
#[derive(Debug)]
pub struct BroadcastPublisher {
    capacity: usize,
    senders: RwLock<BTreeMap<Channel, broadcast::Sender<EngineEvent>>>,
}

impl BroadcastPublisher {
    /// Create a publisher whose channels buffer `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            senders: RwLock::new(BTreeMap::new()),
        }
    }

    /// Subscribe to a channel, creating it on first use.
    pub async fn subscribe(&self, channel: Channel) -> broadcast::Receiver<EngineEvent> {
        let mut senders = self.senders.write().await;
        senders.retain(|_, sender| sender.receiver_count() > 0);
        senders
            .entry(channel)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live receivers on a channel.
    pub async fn subscriber_count(&self, channel: Channel) -> usize {
        self.senders
            .read()
            .await
            .get(&channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of channels currently held.
    pub async fn channel_count(&self) -> usize {
        self.senders.read().await.len()
    }

    async fn prune(&self, channel: Channel) {
        let mut senders = self.senders.write().await;
        if senders.get(&channel).is_some_and(|s| s.receiver_count() == 0) {
            senders.remove(&channel);
        }
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventPublisher for BroadcastPublisher {
    async fn publish_if_subscribed(
        &self,
        channel: Channel,
        event: &EngineEvent,
    ) -> Result<PublishOutcome, PublishError> {
        let sent = {
            let senders = self.senders.read().await;
            let Some(sender) = senders.get(&channel) else {
                return Ok(PublishOutcome::NoSubscribers);
            };
            // The last receiver can drop between the count and the send.
            sender.receiver_count() > 0 && sender.send(event.clone()).is_ok()
        };
        if sent {
            return Ok(PublishOutcome::Published);
        }
        self.prune(channel).await;
        Ok(PublishOutcome::NoSubscribers)
    }
}
