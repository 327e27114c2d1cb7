//! Assembly of the full engine: registry + router + digest buffer + flush
//! scheduler behind one handle.

use std::sync::Arc;

use tracing::info;

use herald_config::NotifyConfig;
use herald_core::Event;

use crate::adapters::Transport;
use crate::digest::DigestBuffer;
use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::router::{DispatchOutcome, NotificationRouter};
use crate::scheduler::{FlushHandle, FlushScheduler};
use crate::source::SubscriberSource;

/// The notification engine: owns the registry, the digest buffer, the
/// router, and (once started) the background flush task.
pub struct NotificationEngine {
    registry: Arc<SubscriberRegistry>,
    buffer: Arc<DigestBuffer>,
    router: NotificationRouter,
    transport: Arc<dyn Transport>,
    config: NotifyConfig,
    flush_task: Option<FlushHandle>,
}

impl NotificationEngine {
    pub fn new(config: NotifyConfig, transport: Arc<dyn Transport>) -> Self {
        let registry = Arc::new(SubscriberRegistry::new());
        let buffer = Arc::new(DigestBuffer::new(config.max_message_len));
        let router = NotificationRouter::new(
            registry.clone(),
            buffer.clone(),
            transport.clone(),
            config.clone(),
        );
        Self {
            registry,
            buffer,
            router,
            transport,
            config,
            flush_task: None,
        }
    }

    /// Start the periodic flush task. Idempotent.
    pub fn start(&mut self) {
        if self.flush_task.is_none() {
            self.flush_task = Some(FlushScheduler::start(
                self.buffer.clone(),
                self.transport.clone(),
                self.config.flush_interval(),
            ));
            info!("Notification engine started");
        }
    }

    /// Reload the subscriber registry from the source. Called after any
    /// external mutation; a failed reload keeps the previous snapshot.
    pub async fn reload(&self, source: &dyn SubscriberSource) -> Result<usize> {
        self.registry.load(source).await
    }

    pub async fn dispatch(&self, event: &Event) -> DispatchOutcome {
        self.router.dispatch(event, false).await
    }

    pub async fn dispatch_to_admins(&self, event: &Event) -> DispatchOutcome {
        self.router.dispatch_to_admins(event).await
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Stop the flush task, waiting for its guaranteed final flush. If the
    /// engine was never started this still drains the buffer once.
    pub async fn shutdown(mut self) {
        match self.flush_task.take() {
            Some(handle) => handle.stop().await,
            None => {
                self.buffer.flush(self.transport.as_ref()).await;
            }
        }
        info!("Notification engine stopped");
    }
}
