//! Notification routing and digest buffering for Herald.
//!
//! Events enter through [`NotificationRouter::dispatch`], which evaluates
//! every subscriber in the current registry snapshot and either sends
//! immediately, buffers for the next digest, or drops. A background
//! [`FlushScheduler`] task drains the [`DigestBuffer`] periodically and once
//! more on shutdown.

pub mod adapters;
pub mod digest;
pub mod error;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod service;
pub mod source;

pub use adapters::{TelegramTransport, Transport};
pub use digest::DigestBuffer;
pub use error::{NotifyError, Result};
pub use registry::{RegistrySnapshot, SubscriberRegistry};
pub use router::{DispatchOutcome, NotificationRouter};
pub use scheduler::{FlushHandle, FlushScheduler};
pub use service::NotificationEngine;
pub use source::{MemorySubscriberSource, SubscriberSource};
