use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{Balance, LedgerEntry, NewLedgerEntry, OrderNumber, Points, UserId, Withdrawal};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} has already been credited")]
    DuplicateCredit(OrderNumber),
    #[error("A withdrawal against order {0} already exists")]
    DuplicateWithdrawal(OrderNumber),
}

/// The append-only points ledger. Entries are never modified once written.
#[async_trait]
pub trait LedgerManagement: Send + Sync {
    /// Appends an entry and returns it with its assigned id.
    ///
    /// A second credit against the same order fails with [`LedgerError::DuplicateCredit`], and a second debit against
    /// the same order with [`LedgerError::DuplicateWithdrawal`].
    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError>;

    /// The sum of every entry for the user. Zero when the user has no entries.
    async fn sum_for_user(&self, user_id: UserId) -> Result<Points, LedgerError>;

    async fn balance_for_user(&self, user_id: UserId) -> Result<Balance, LedgerError>;

    /// All of the user's debits, newest first.
    async fn withdrawals_for_user(&self, user_id: UserId) -> Result<Vec<Withdrawal>, LedgerError>;

    async fn withdrawal_for_order(&self, number: &OrderNumber) -> Result<Option<Withdrawal>, LedgerError>;
}
