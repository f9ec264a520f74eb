//! Read-only queries about a user's points.
use std::fmt::Debug;

use log::trace;

use crate::{
    db_types::{Balance, OrderWithAccrual, UserId, Withdrawal},
    loyalty_api::errors::AccountApiError,
    traits::{LedgerManagement, OrderManagement},
};

/// The `AccountApi` provides a unified API for looking up a user's balance, orders and withdrawals.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: OrderManagement + LedgerManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The user's current balance, and the total they have withdrawn to date.
    pub async fn balance(&self, user_id: UserId) -> Result<Balance, AccountApiError> {
        let balance = self.db.balance_for_user(user_id).await?;
        trace!("💻️ Balance for user #{user_id}: {balance:?}");
        Ok(balance)
    }

    /// All the user's orders, newest first, each with the points it earned (if any).
    pub async fn orders(&self, user_id: UserId) -> Result<Vec<OrderWithAccrual>, AccountApiError> {
        Ok(self.db.fetch_orders_for_user(user_id).await?)
    }

    /// All the user's withdrawals, newest first.
    pub async fn withdrawals(&self, user_id: UserId) -> Result<Vec<Withdrawal>, AccountApiError> {
        Ok(self.db.withdrawals_for_user(user_id).await?)
    }
}
