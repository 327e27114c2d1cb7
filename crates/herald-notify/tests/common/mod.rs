#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use herald_core::{ApprovalState, Severity, Subscriber, SubscriberId};
use herald_notify::{NotifyError, Transport};

/// Transport double that records every send and can be told to reject
/// specific recipients.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(SubscriberId, String)>>,
    failing: Mutex<HashSet<SubscriberId>>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send will sleep this long before completing.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_for(&self, id: impl Into<SubscriberId>) {
        self.failing.lock().unwrap().insert(id.into());
    }

    pub fn sent(&self) -> Vec<(SubscriberId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, id: impl Into<SubscriberId>) -> Vec<String> {
        let id = id.into();
        self.sent()
            .into_iter()
            .filter(|(recipient, _)| *recipient == id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, recipient: &SubscriberId, text: &str) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(recipient) {
            return Err(NotifyError::send_failed("recipient rejected"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.clone(), text.to_string()));
        Ok(())
    }
}

/// An enabled, active subscriber that hears everything.
pub fn active_subscriber(id: &str) -> Subscriber {
    let mut sub = Subscriber::new(id);
    sub.state = ApprovalState::Active;
    sub.min_level = Severity::Debug;
    sub
}
