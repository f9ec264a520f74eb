use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The order is not registered with the accrual service")]
    NotRegistered,
    #[error("The accrual service reported an internal error")]
    UpstreamInternal,
    #[error("Too many requests. Pausing for {}s", pause.as_secs_f64())]
    RateLimited { pause: Duration },
    #[error("Unexpected status code from the accrual service: {0}")]
    UnknownStatus(u16),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Invalid accrual response: {0}")]
    InvalidResponse(String),
}

impl AccrualApiError {
    /// Transient errors leave the order untouched; a later poll may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotRegistered | Self::UpstreamInternal | Self::RateLimited { .. })
    }
}
