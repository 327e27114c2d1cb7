use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Registry load failed: {0}")]
    RegistryLoad(String),

    #[error("Subscriber not found: {0}")]
    SubscriberNotFound(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

impl NotifyError {
    pub fn registry_load(msg: impl Into<String>) -> Self {
        Self::RegistryLoad(msg.into())
    }

    pub fn send_failed(msg: impl Into<String>) -> Self {
        Self::SendFailed(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
