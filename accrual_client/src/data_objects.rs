use std::fmt::Display;

use loyalty_common::Points;
use serde::{Deserialize, Serialize};

/// The order states reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// The order is known, but no calculation has started.
    Registered,
    /// The reward is being calculated.
    Processing,
    /// The order will never earn a reward.
    Invalid,
    /// The reward has been calculated and is final.
    Processed,
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualStatus::Registered => write!(f, "REGISTERED"),
            AccrualStatus::Processing => write!(f, "PROCESSING"),
            AccrualStatus::Invalid => write!(f, "INVALID"),
            AccrualStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

/// The body of a `200 OK` reply from `GET /api/orders/{number}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl AccrualResponse {
    /// The reward for the order, or zero when the service did not send one.
    pub fn accrual_or_zero(&self) -> Points {
        self.accrual.unwrap_or_default()
    }
}
