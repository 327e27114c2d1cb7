pub mod telegram;

use async_trait::async_trait;

use herald_core::SubscriberId;

use crate::error::NotifyError;

/// Outgoing delivery channel for one rendered text message.
///
/// Implementations may block or time out internally; the engine imposes no
/// timeout of its own and treats every failure as affecting only the one
/// recipient it was for. The engine pre-splits digests so that no call ever
/// carries more than the configured maximum message size.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, recipient: &SubscriberId, text: &str) -> Result<(), NotifyError>;
}

pub use telegram::TelegramTransport;
