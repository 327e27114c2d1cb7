use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::severity::Severity;

/// A log-like application event entering the notification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub message: String,
    pub level: Severity,
    pub topic: String,

    /// Assigned at ingestion, not supplied by the producer.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Event {
    pub fn new(level: Severity, topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            topic: topic.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// The buffered form of an event destined for a digest-tier subscriber.
///
/// The recipient is the key of the pending map, so it is not repeated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
    pub message: String,
    pub topic: String,
    pub level: Severity,
    pub buffered_at: OffsetDateTime,
}
