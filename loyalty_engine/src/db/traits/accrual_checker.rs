use std::time::Duration;

use accrual_client::{AccrualApiError, AccrualProxy, AccrualResponse};
use async_trait::async_trait;

use crate::db_types::OrderNumber;

/// Asks the accrual service how many points an order earns.
#[async_trait]
pub trait AccrualChecker: Send + Sync {
    async fn check_accrual(&self, number: &OrderNumber) -> Result<AccrualResponse, AccrualApiError>;

    /// Holds back every accrual request for `duration`.
    async fn pause(&self, duration: Duration);
}

#[async_trait]
impl AccrualChecker for AccrualProxy {
    async fn check_accrual(&self, number: &OrderNumber) -> Result<AccrualResponse, AccrualApiError> {
        AccrualProxy::check_accrual(self, number.as_str()).await
    }

    async fn pause(&self, duration: Duration) {
        AccrualProxy::pause(self, duration).await
    }
}
