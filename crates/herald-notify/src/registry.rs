//! In-memory subscriber registry with wholesale atomic reloads.
//!
//! The registry holds an immutable [`RegistrySnapshot`] behind an `ArcSwap`:
//! reads are a single atomic load and never block, a reload builds the new
//! snapshot completely off to the side and publishes it with one pointer
//! store. Readers that already hold a snapshot keep iterating the old one;
//! no reader ever observes a half-replaced subscriber set.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, warn};

use herald_core::{Subscriber, SubscriberId};

use crate::error::{NotifyError, Result};
use crate::source::SubscriberSource;

/// Immutable point-in-time view of all subscriber records.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    subscribers: Vec<Subscriber>,
    index: HashMap<SubscriberId, usize>,
    /// Admin ids, precomputed at build time so admin broadcasts do not
    /// re-scan the whole table.
    admins: Vec<SubscriberId>,
}

impl RegistrySnapshot {
    fn build(subscribers: Vec<Subscriber>) -> Self {
        let index = subscribers
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let admins = subscribers
            .iter()
            .filter(|s| s.enabled && s.state.is_admin())
            .map(|s| s.id.clone())
            .collect();
        Self {
            subscribers,
            index,
            admins,
        }
    }

    pub fn get(&self, id: &SubscriberId) -> Option<&Subscriber> {
        self.index.get(id).map(|&i| &self.subscribers[i])
    }

    pub fn list(&self) -> &[Subscriber] {
        &self.subscribers
    }

    pub fn admins(&self) -> &[SubscriberId] {
        &self.admins
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Shared registry handle.
pub struct SubscriberRegistry {
    inner: ArcSwap<RegistrySnapshot>,
}

impl SubscriberRegistry {
    /// Create an empty registry; call [`load`](Self::load) to populate it.
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(RegistrySnapshot::default()),
        }
    }

    /// Create a registry pre-populated with the given subscribers.
    pub fn with_subscribers(subscribers: Vec<Subscriber>) -> Self {
        Self {
            inner: ArcSwap::from_pointee(RegistrySnapshot::build(subscribers)),
        }
    }

    /// Replace the entire subscriber set from the source.
    ///
    /// The snapshot is built before the store, so the swap itself is a
    /// single atomic operation. If the source fails the previous snapshot
    /// stays in place and the error is returned; the registry never goes
    /// empty because of a failed reload.
    pub async fn load(&self, source: &dyn SubscriberSource) -> Result<usize> {
        let subscribers = source.fetch_all().await.map_err(|e| {
            warn!(error = %e, "Registry reload failed, keeping previous snapshot");
            NotifyError::registry_load(e.to_string())
        })?;

        let snapshot = RegistrySnapshot::build(subscribers);
        let count = snapshot.len();
        self.inner.store(Arc::new(snapshot));
        info!(subscribers = count, "Registry reloaded");
        Ok(count)
    }

    /// Current snapshot (lock-free). Hold the returned `Arc` for the whole
    /// dispatch pass so one consistent view is used throughout.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.inner.load_full()
    }

    pub fn get(&self, id: &SubscriberId) -> Option<Subscriber> {
        self.snapshot().get(id).cloned()
    }

    pub fn admins(&self) -> Vec<SubscriberId> {
        self.snapshot().admins().to_vec()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{ApprovalState, Severity};

    fn subscriber(id: &str, state: ApprovalState) -> Subscriber {
        let mut sub = Subscriber::new(id);
        sub.state = state;
        sub.min_level = Severity::Debug;
        sub
    }

    #[test]
    fn test_snapshot_lookup_and_admin_cache() {
        let registry = SubscriberRegistry::with_subscribers(vec![
            subscriber("a", ApprovalState::Active),
            subscriber("b", ApprovalState::Admin),
            subscriber("c", ApprovalState::Pending),
        ]);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.get(&SubscriberId::from("a")).is_some());
        assert!(snapshot.get(&SubscriberId::from("zzz")).is_none());
        assert_eq!(snapshot.admins(), &[SubscriberId::from("b")]);
    }

    #[test]
    fn test_disabled_admin_not_cached() {
        let mut admin = subscriber("b", ApprovalState::Admin);
        admin.enabled = false;
        let registry = SubscriberRegistry::with_subscribers(vec![admin]);
        assert!(registry.admins().is_empty());
    }

    #[test]
    fn test_old_snapshot_survives_store() {
        let registry = SubscriberRegistry::with_subscribers(vec![subscriber(
            "a",
            ApprovalState::Active,
        )]);
        let old = registry.snapshot();

        registry
            .inner
            .store(Arc::new(RegistrySnapshot::build(vec![
                subscriber("x", ApprovalState::Active),
                subscriber("y", ApprovalState::Active),
            ])));

        // Holder of the old snapshot keeps its consistent view.
        assert_eq!(old.len(), 1);
        assert_eq!(registry.snapshot().len(), 2);
    }
}
