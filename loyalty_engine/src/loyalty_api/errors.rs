use thiserror::Error;

use crate::{
    balance_service::BalanceError,
    db_types::{InvalidOrderNumber, OrderNumber, Points},
    traits::{LedgerError, OrderManagementError},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid order number: '{0}'")]
    InvalidOrderNumber(String),
    #[error("Order {0} was submitted by another user")]
    OwnedByAnotherUser(OrderNumber),
    #[error("A withdrawal against order {0} already exists")]
    DuplicateWithdrawal(OrderNumber),
    #[error("Withdrawal amounts must be positive, got {0}")]
    InvalidAmount(Points),
    #[error("Insufficient funds. Balance is {balance}, but {requested} was requested")]
    InsufficientFunds { balance: Points, requested: Points },
}

impl From<InvalidOrderNumber> for OrderFlowError {
    fn from(e: InvalidOrderNumber) -> Self {
        Self::InvalidOrderNumber(e.0)
    }
}

impl From<OrderManagementError> for OrderFlowError {
    fn from(e: OrderManagementError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<LedgerError> for OrderFlowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DuplicateWithdrawal(n) => Self::DuplicateWithdrawal(n),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<BalanceError> for OrderFlowError {
    fn from(e: BalanceError) -> Self {
        match e {
            BalanceError::InvalidAmount(p) => Self::InvalidAmount(p),
            BalanceError::InsufficientFunds { balance, requested } => Self::InsufficientFunds { balance, requested },
            BalanceError::DuplicateWithdrawal(n) => Self::DuplicateWithdrawal(n),
            BalanceError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OrderManagementError> for AccountApiError {
    fn from(e: OrderManagementError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<LedgerError> for AccountApiError {
    fn from(e: LedgerError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
