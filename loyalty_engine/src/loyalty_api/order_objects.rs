use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Points};

/// The outcome of a successful order submission.
#[derive(Debug, Clone)]
pub enum SubmitOrderResult {
    /// The order is new and has been accepted for accrual processing.
    Accepted(Order),
    /// The same user submitted this order before.
    AlreadySubmitted(Order),
}

impl SubmitOrderResult {
    pub fn order(&self) -> &Order {
        match self {
            Self::Accepted(o) | Self::AlreadySubmitted(o) => o,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// A request to spend points against an order number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub order: String,
    pub sum: Points,
}
