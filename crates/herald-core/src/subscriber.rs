use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::severity::Severity;

/// Opaque recipient identifier.
///
/// The engine never interprets the value; for the Telegram transport it is
/// the chat id, other transports may use whatever addressing they need.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Approval state of a subscriber.
///
/// Only `Active` and `Admin` subscribers receive anything. Transitions are
/// performed by the external mutation layer and become visible to the engine
/// on the next registry load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    Unregistered,
    Pending,
    Active,
    Admin,
}

impl ApprovalState {
    /// Whether this state is allowed to receive notifications at all.
    pub fn may_receive(&self) -> bool {
        matches!(self, Self::Active | Self::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Unregistered → Pending (a registration request was filed).
    pub fn request(self) -> Self {
        match self {
            Self::Unregistered => Self::Pending,
            other => other,
        }
    }

    /// Pending → Active (request approved).
    pub fn approve(self) -> Self {
        match self {
            Self::Pending => Self::Active,
            other => other,
        }
    }

    /// Active → Admin (one-way promotion).
    pub fn promote(self) -> Self {
        match self {
            Self::Active => Self::Admin,
            other => other,
        }
    }

    /// Any state → Unregistered (revocation / demotion).
    pub fn revoke(self) -> Self {
        Self::Unregistered
    }
}

impl FromStr for ApprovalState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unregistered" => Ok(Self::Unregistered),
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "admin" => Ok(Self::Admin),
            other => Err(CoreError::invalid_approval_state(other)),
        }
    }
}

/// Delivery tier chosen by a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryTier {
    /// Every matching event is sent immediately.
    Realtime,
    /// Only events at or above the configured critical threshold are sent;
    /// everything else is dropped.
    CriticalOnly,
    /// Matching events are buffered and delivered as periodic digests.
    Digest,
}

impl FromStr for DeliveryTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "realtime" => Ok(Self::Realtime),
            "criticalonly" | "critical-only" | "critical_only" => Ok(Self::CriticalOnly),
            "digest" => Ok(Self::Digest),
            other => Err(CoreError::invalid_tier(other)),
        }
    }
}

/// Sentinel the legacy list encoding used to mean "subscribed to nothing".
const LEGACY_UNSUBSCRIBE_SENTINEL: &str = "-";

/// Tri-state topic selector.
///
/// Replaces the legacy overloaded list encoding (empty list = everything,
/// a sentinel entry = nothing, anything else = that set). The legacy form
/// is accepted only through [`TopicFilter::from_legacy`] at the storage
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "topics")]
pub enum TopicFilter {
    /// Subscribed to every topic.
    All,
    /// Subscribed to nothing.
    None,
    /// Subscribed to exactly this non-empty set of topics.
    Exactly(BTreeSet<String>),
}

impl TopicFilter {
    /// Build a filter from an explicit set of topic names.
    ///
    /// An empty set collapses to `None`: a subscriber who listed no topics
    /// asked for nothing, the "everything" case is `All`.
    pub fn exactly<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = topics.into_iter().map(Into::into).collect();
        if set.is_empty() { Self::None } else { Self::Exactly(set) }
    }

    /// One-time migration from the legacy list encoding.
    ///
    /// Empty list means match-all. A list containing the unsubscribe
    /// sentinel means match-none, even when real topic names are also
    /// present: an opt-out must not be undone by stale entries.
    pub fn from_legacy<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        let mut saw_sentinel = false;
        for topic in topics {
            let topic = topic.as_ref();
            if topic == LEGACY_UNSUBSCRIBE_SENTINEL {
                saw_sentinel = true;
            } else {
                set.insert(topic.to_string());
            }
        }
        if saw_sentinel {
            Self::None
        } else if set.is_empty() {
            Self::All
        } else {
            Self::Exactly(set)
        }
    }

    /// Total match predicate: every (filter, topic) pair resolves.
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Exactly(set) => set.contains(topic),
        }
    }
}

impl Default for TopicFilter {
    fn default() -> Self {
        Self::All
    }
}

/// A registered notification recipient and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,

    /// Master on/off switch, independent of approval state.
    #[serde(default = "default_true")]
    pub enabled: bool,

    pub state: ApprovalState,

    /// Minimum severity this subscriber wants to hear about.
    pub min_level: Severity,

    #[serde(default)]
    pub topics: TopicFilter,

    /// Delivery tier; `None` means the engine-wide default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<DeliveryTier>,
}

fn default_true() -> bool {
    true
}

impl Subscriber {
    pub fn new(id: impl Into<SubscriberId>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            state: ApprovalState::Pending,
            min_level: Severity::Info,
            topics: TopicFilter::All,
            tier: None,
        }
    }

    /// The tier actually used for dispatch, applying the default at read
    /// time so the effective tier is never absent.
    pub fn effective_tier(&self, default: DeliveryTier) -> DeliveryTier {
        self.tier.unwrap_or(default)
    }
}
