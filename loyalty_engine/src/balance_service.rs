//! Guarded debits against the points ledger.
use std::sync::Arc;

use log::*;
use thiserror::Error;

use crate::{
    db_types::{LedgerEntry, NewLedgerEntry, OrderNumber, Points, UserId},
    traits::{LedgerError, LedgerManagement},
    user_locks::UserLocks,
};

#[derive(Debug, Clone, Error)]
pub enum BalanceError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Points),
    #[error("Insufficient funds. Balance is {balance}, but {requested} was requested")]
    InsufficientFunds { balance: Points, requested: Points },
    #[error("A withdrawal against order {0} already exists")]
    DuplicateWithdrawal(OrderNumber),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<LedgerError> for BalanceError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DuplicateWithdrawal(n) => Self::DuplicateWithdrawal(n),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

/// Spends points from a user's balance. Debits for the same user are serialised through [`UserLocks`]; different
/// users proceed in parallel.
#[derive(Clone)]
pub struct BalanceService {
    ledger: Arc<dyn LedgerManagement>,
    locks: UserLocks,
}

impl BalanceService {
    pub fn new(ledger: Arc<dyn LedgerManagement>, locks: UserLocks) -> Self {
        Self { ledger, locks }
    }

    /// The user's spendable balance.
    pub async fn balance(&self, user_id: UserId) -> Result<Points, BalanceError> {
        Ok(self.ledger.sum_for_user(user_id).await?)
    }

    /// Debits `amount` from the user's balance against `order`.
    ///
    /// The balance check and the debit happen while holding the user's lock, so concurrent spends can never take the
    /// balance below zero. Fails with [`BalanceError::InsufficientFunds`] without writing anything if the balance is
    /// too low.
    pub async fn spend(&self, user_id: UserId, amount: Points, order: &OrderNumber) -> Result<LedgerEntry, BalanceError> {
        if !amount.is_positive() {
            return Err(BalanceError::InvalidAmount(amount));
        }
        let _guard = self.locks.acquire(user_id).await;
        let balance = self.ledger.sum_for_user(user_id).await.map_err(|e| {
            error!("🧾️ Could not fetch the balance for user #{user_id}. {e}");
            BalanceError::from(e)
        })?;
        if balance < amount {
            debug!("🧾️ User #{user_id} tried to spend {amount} on order {order}, but only has {balance}");
            return Err(BalanceError::InsufficientFunds { balance, requested: amount });
        }
        let entry = NewLedgerEntry::debit(user_id, amount, order.clone());
        let entry = self.ledger.insert_ledger_entry(entry).await.map_err(|e| {
            match &e {
                LedgerError::DuplicateWithdrawal(_) => debug!("🧾️ Duplicate withdrawal for order {order}"),
                _ => error!("🧾️ Could not write debit for user #{user_id} (order {order}). {e}"),
            }
            BalanceError::from(e)
        })?;
        info!("🧾️ User #{user_id} spent {amount} on order {order}");
        Ok(entry)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use futures_util::future::join_all;

    use super::*;
    use crate::test_utils::memory_db::MemoryDatabase;

    fn service(db: &MemoryDatabase) -> BalanceService {
        BalanceService::new(Arc::new(db.clone()), UserLocks::new())
    }

    #[tokio::test]
    async fn spend_debits_the_ledger() {
        let db = MemoryDatabase::new();
        db.credit(1, Points::from_points(100), "1");
        let svc = service(&db);
        let entry = svc.spend(1, Points::from_points(40), &"2".into()).await.unwrap();
        assert_eq!(entry.difference, Points::from_points(-40));
        assert_eq!(entry.order_number, Some("2".into()));
        assert_eq!(svc.balance(1).await.unwrap(), Points::from_points(60));
    }

    #[tokio::test]
    async fn spending_everything_is_allowed() {
        let db = MemoryDatabase::new();
        db.credit(1, Points::from(1150), "1");
        let svc = service(&db);
        svc.spend(1, Points::from(1150), &"2".into()).await.unwrap();
        assert_eq!(svc.balance(1).await.unwrap(), Points::default());
    }

    #[tokio::test]
    async fn insufficient_funds_writes_nothing() {
        let db = MemoryDatabase::new();
        db.credit(1, Points::from_points(10), "1");
        let svc = service(&db);
        let err = svc.spend(1, Points::from_points(11), &"2".into()).await.unwrap_err();
        assert!(matches!(err, BalanceError::InsufficientFunds { .. }));
        assert_eq!(db.ledger_entries().len(), 1);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let db = MemoryDatabase::new();
        let svc = service(&db);
        assert!(matches!(svc.spend(1, Points::default(), &"2".into()).await, Err(BalanceError::InvalidAmount(_))));
        assert!(matches!(svc.spend(1, Points::from(-5), &"2".into()).await, Err(BalanceError::InvalidAmount(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_spends_never_overdraw() {
        let db = MemoryDatabase::new().with_ledger_delay(Duration::from_millis(5));
        db.credit(3, Points::from_points(100), "1");
        let svc = service(&db);
        let spends = (0..10).map(|i| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.spend(3, Points::from_points(30), &OrderNumber(format!("{}", 100 + i))).await })
        });
        let results = join_all(spends).await.into_iter().map(|r| r.unwrap()).collect::<Vec<_>>();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let refused =
            results.iter().filter(|r| matches!(r, Err(BalanceError::InsufficientFunds { .. }))).count();
        assert_eq!(succeeded, 3);
        assert_eq!(refused, 7);
        assert_eq!(svc.balance(3).await.unwrap(), Points::from_points(10));
    }

    #[tokio::test]
    async fn duplicate_withdrawal_is_reported() {
        let db = MemoryDatabase::new();
        db.credit(1, Points::from_points(100), "1");
        let svc = service(&db);
        svc.spend(1, Points::from_points(1), &"2".into()).await.unwrap();
        let err = svc.spend(1, Points::from_points(1), &"2".into()).await.unwrap_err();
        assert!(matches!(err, BalanceError::DuplicateWithdrawal(_)));
    }
}
