use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use herald_core::{ApprovalState, DeliveryTier, Subscriber, SubscriberId, TopicFilter};

use crate::error::NotifyError;

/// Boundary to the persistent subscriber store.
///
/// The engine only ever calls [`fetch_all`](SubscriberSource::fetch_all),
/// and only through [`SubscriberRegistry::load`](crate::SubscriberRegistry::load).
/// The mutation surface exists for the command layer; after any mutation the
/// caller is responsible for triggering a fresh registry load — the engine
/// does not poll for changes.
#[async_trait]
pub trait SubscriberSource: Send + Sync {
    /// Fetch every subscriber with its current settings.
    async fn fetch_all(&self) -> Result<Vec<Subscriber>, NotifyError>;

    async fn set_enabled(&self, id: &SubscriberId, enabled: bool) -> Result<(), NotifyError>;

    async fn set_state(&self, id: &SubscriberId, state: ApprovalState) -> Result<(), NotifyError>;

    async fn set_topics(&self, id: &SubscriberId, topics: TopicFilter) -> Result<(), NotifyError>;

    async fn set_tier(&self, id: &SubscriberId, tier: Option<DeliveryTier>)
    -> Result<(), NotifyError>;
}

/// In-memory subscriber store, used in tests and for embedding without an
/// external database.
#[derive(Default)]
pub struct MemorySubscriberSource {
    records: Mutex<HashMap<SubscriberId, Subscriber>>,
    unavailable: AtomicBool,
}

impl MemorySubscriberSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers(subscribers: impl IntoIterator<Item = Subscriber>) -> Self {
        let records = subscribers.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            records: Mutex::new(records),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, subscriber: Subscriber) {
        self.records
            .lock()
            .expect("subscriber store lock poisoned")
            .insert(subscriber.id.clone(), subscriber);
    }

    /// Simulate the backing store being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), NotifyError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(NotifyError::registry_load("subscriber store unavailable"))
        } else {
            Ok(())
        }
    }

    fn update(
        &self,
        id: &SubscriberId,
        f: impl FnOnce(&mut Subscriber),
    ) -> Result<(), NotifyError> {
        self.check_available()?;
        let mut records = self.records.lock().expect("subscriber store lock poisoned");
        match records.get_mut(id) {
            Some(subscriber) => {
                f(subscriber);
                Ok(())
            }
            None => Err(NotifyError::SubscriberNotFound(id.to_string())),
        }
    }
}

#[async_trait]
impl SubscriberSource for MemorySubscriberSource {
    async fn fetch_all(&self) -> Result<Vec<Subscriber>, NotifyError> {
        self.check_available()?;
        let records = self.records.lock().expect("subscriber store lock poisoned");
        let mut all: Vec<Subscriber> = records.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn set_enabled(&self, id: &SubscriberId, enabled: bool) -> Result<(), NotifyError> {
        self.update(id, |s| s.enabled = enabled)
    }

    async fn set_state(&self, id: &SubscriberId, state: ApprovalState) -> Result<(), NotifyError> {
        self.update(id, |s| s.state = state)
    }

    async fn set_topics(&self, id: &SubscriberId, topics: TopicFilter) -> Result<(), NotifyError> {
        self.update(id, |s| s.topics = topics)
    }

    async fn set_tier(
        &self,
        id: &SubscriberId,
        tier: Option<DeliveryTier>,
    ) -> Result<(), NotifyError> {
        self.update(id, |s| s.tier = tier)
    }
}
