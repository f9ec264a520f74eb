use std::fmt::Debug;

use log::*;

use crate::{
    accrual_pool::{AccrualPool, PoolError},
    balance_service::BalanceService,
    db_types::{LedgerEntry, NewOrder, OrderNumber, Points, UserId},
    loyalty_api::{errors::OrderFlowError, order_objects::SubmitOrderResult},
    traits::{LedgerManagement, OrderManagement, OrderManagementError},
};

/// `OrderFlowApi` is the primary API for order submissions and point withdrawals.
pub struct OrderFlowApi<B> {
    db: B,
    pool: AccrualPool,
    balance: BalanceService,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, pool: AccrualPool, balance: BalanceService) -> Self {
        Self { db, pool, balance }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + LedgerManagement
{
    /// Submit an order number on behalf of a user.
    ///
    /// New orders are stored as `NEW` and offered to the accrual pool. If the pool cannot take the order right now, it
    /// stays `NEW` and the reconciler will pick it up later; the submission still counts as accepted.
    ///
    /// Resubmitting one's own order is not an error, and returns [`SubmitOrderResult::AlreadySubmitted`].
    pub async fn submit_order(&self, user_id: UserId, raw_number: &str) -> Result<SubmitOrderResult, OrderFlowError> {
        let number = OrderNumber::parse(raw_number)?;
        if let Some(existing) = self.existing_order(user_id, &number).await? {
            return Ok(existing);
        }
        let order = match self.db.insert_order(NewOrder::new(number.clone(), user_id)).await {
            Ok(order) => order,
            // Lost a race with another submission of the same number
            Err(OrderManagementError::OrderAlreadyExists(_)) => {
                return self
                    .existing_order(user_id, &number)
                    .await?
                    .ok_or_else(|| OrderFlowError::DatabaseError(format!("Order {number} vanished after insert")));
            },
            Err(e) => {
                error!("🔄️📦️ Could not store order {number} for user #{user_id}. {e}");
                return Err(e.into());
            },
        };
        info!("🔄️📦️ Order {number} submitted by user #{user_id}");
        match self.pool.push(order.clone()).await {
            Ok(true) => trace!("🔄️📦️ Order {number} queued for accrual"),
            Ok(false) => info!("🔄️📦️ The accrual queue is full. Order {number} will be picked up later"),
            Err(PoolError::Closed) => warn!("🔄️📦️ The accrual pool is closed. Order {number} will be picked up later"),
        }
        Ok(SubmitOrderResult::Accepted(order))
    }

    /// Spend `sum` points from the user's balance against `raw_number`.
    ///
    /// Each order number can be withdrawn against at most once.
    pub async fn withdraw(&self, user_id: UserId, raw_number: &str, sum: Points) -> Result<LedgerEntry, OrderFlowError> {
        let number = OrderNumber::parse(raw_number)?;
        if !sum.is_positive() {
            return Err(OrderFlowError::InvalidAmount(sum));
        }
        if self.db.withdrawal_for_order(&number).await?.is_some() {
            debug!("🔄️💰️ User #{user_id} tried to withdraw against order {number} a second time");
            return Err(OrderFlowError::DuplicateWithdrawal(number));
        }
        let entry = self.balance.spend(user_id, sum, &number).await?;
        Ok(entry)
    }

    async fn existing_order(
        &self,
        user_id: UserId,
        number: &OrderNumber,
    ) -> Result<Option<SubmitOrderResult>, OrderFlowError> {
        match self.db.fetch_order(number).await? {
            Some(order) if order.user_id == user_id => {
                debug!("🔄️📦️ User #{user_id} resubmitted order {number}");
                Ok(Some(SubmitOrderResult::AlreadySubmitted(order)))
            },
            Some(order) => {
                debug!("🔄️📦️ User #{user_id} submitted order {number}, which belongs to user #{}", order.user_id);
                Err(OrderFlowError::OwnedByAnotherUser(number.clone()))
            },
            None => Ok(None),
        }
    }
}
