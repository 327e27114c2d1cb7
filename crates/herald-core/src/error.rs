use thiserror::Error;

/// Core error types for Herald domain values
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid severity level: {0}")]
    InvalidSeverity(String),

    #[error("Invalid delivery tier: {0}")]
    InvalidTier(String),

    #[error("Invalid approval state: {0}")]
    InvalidApprovalState(String),
}

impl CoreError {
    pub fn invalid_severity(value: impl Into<String>) -> Self {
        Self::InvalidSeverity(value.into())
    }

    pub fn invalid_tier(value: impl Into<String>) -> Self {
        Self::InvalidTier(value.into())
    }

    pub fn invalid_approval_state(value: impl Into<String>) -> Self {
        Self::InvalidApprovalState(value.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
