pub mod error;
pub mod event;
pub mod severity;
pub mod subscriber;

pub use error::{CoreError, Result};
pub use event::{DigestEntry, Event};
pub use severity::Severity;
pub use subscriber::{ApprovalState, DeliveryTier, Subscriber, SubscriberId, TopicFilter};
