//! Per-event fan-out: decide drop / send-now / buffer for every subscriber.

use std::sync::Arc;

use tracing::{debug, warn};

use herald_config::NotifyConfig;
use herald_core::{DeliveryTier, Event};

use crate::adapters::Transport;
use crate::digest::DigestBuffer;
use crate::registry::SubscriberRegistry;

/// What one dispatch pass did, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Immediate sends handed to the transport successfully.
    pub sent: u32,
    /// Entries handed to the digest buffer.
    pub buffered: u32,
    /// Immediate sends the transport rejected.
    pub failed: u32,
}

/// The filter-and-dispatch pipeline, invoked once per event.
pub struct NotificationRouter {
    registry: Arc<SubscriberRegistry>,
    buffer: Arc<DigestBuffer>,
    transport: Arc<dyn Transport>,
    config: NotifyConfig,
}

impl NotificationRouter {
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        buffer: Arc<DigestBuffer>,
        transport: Arc<dyn Transport>,
        config: NotifyConfig,
    ) -> Self {
        Self {
            registry,
            buffer,
            transport,
            config,
        }
    }

    /// Fan an event out to every matching subscriber.
    ///
    /// One registry snapshot is taken up front and used for the whole pass;
    /// registry reloads that land mid-dispatch are not observed. Transport
    /// failures are logged and isolated per subscriber; the producer never
    /// sees a delivery error.
    pub async fn dispatch(&self, event: &Event, restrict_to_admins: bool) -> DispatchOutcome {
        let snapshot = self.registry.snapshot();
        let mut outcome = DispatchOutcome::default();

        for subscriber in snapshot.list() {
            if !subscriber.enabled || !subscriber.state.may_receive() {
                continue;
            }
            if restrict_to_admins && !subscriber.state.is_admin() {
                continue;
            }
            if event.level < subscriber.min_level {
                continue;
            }
            if !subscriber.topics.matches(&event.topic) {
                continue;
            }

            match subscriber.effective_tier(self.config.default_tier) {
                DeliveryTier::Realtime => {
                    match self.transport.send(&subscriber.id, &event.message).await {
                        Ok(()) => outcome.sent += 1,
                        Err(e) => {
                            outcome.failed += 1;
                            warn!(
                                recipient = %subscriber.id,
                                error = %e,
                                "Realtime send failed"
                            );
                        }
                    }
                }
                DeliveryTier::CriticalOnly => {
                    if event.level >= self.config.critical_level {
                        match self.transport.send(&subscriber.id, &event.message).await {
                            Ok(()) => outcome.sent += 1,
                            Err(e) => {
                                outcome.failed += 1;
                                warn!(
                                    recipient = %subscriber.id,
                                    error = %e,
                                    "Critical send failed"
                                );
                            }
                        }
                    }
                }
                DeliveryTier::Digest => {
                    self.buffer
                        .add(&subscriber.id, &event.message, &event.topic, event.level);
                    outcome.buffered += 1;
                }
            }
        }

        debug!(
            topic = %event.topic,
            level = %event.level,
            sent = outcome.sent,
            buffered = outcome.buffered,
            failed = outcome.failed,
            "Event dispatched"
        );
        outcome
    }

    /// Dispatch restricted to admin subscribers.
    pub async fn dispatch_to_admins(&self, event: &Event) -> DispatchOutcome {
        self.dispatch(event, true).await
    }
}
