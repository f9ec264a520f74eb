use thiserror::Error;

use crate::{
    db_types::OrderNumber,
    traits::{LedgerError, OrderManagementError},
};

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Cannot insert duplicate order {0}")]
    DuplicateOrder(OrderNumber),
    #[error("Order {0} has already been credited")]
    DuplicateCredit(OrderNumber),
    #[error("A withdrawal against order {0} already exists")]
    DuplicateWithdrawal(OrderNumber),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
}

impl From<SqliteDatabaseError> for OrderManagementError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DuplicateOrder(n) => Self::OrderAlreadyExists(n),
            SqliteDatabaseError::OrderNotFound(n) => Self::OrderNotFound(n),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<SqliteDatabaseError> for LedgerError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DuplicateCredit(n) => Self::DuplicateCredit(n),
            SqliteDatabaseError::DuplicateWithdrawal(n) => Self::DuplicateWithdrawal(n),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
