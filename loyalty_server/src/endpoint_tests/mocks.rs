use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loyalty_engine::{
    db_types::{
        Balance,
        LedgerEntry,
        NewLedgerEntry,
        NewOrder,
        Order,
        OrderNumber,
        OrderStatusType,
        OrderWithAccrual,
        Points,
        UserId,
        Withdrawal,
    },
    traits::{LedgerError, LedgerManagement, OrderManagement, OrderManagementError},
};
use mockall::mock;

mock! {
    pub LoyaltyDb {}

    #[async_trait]
    impl OrderManagement for LoyaltyDb {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderManagementError>;
        async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderManagementError>;
        async fn fetch_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithAccrual>, OrderManagementError>;
        async fn fetch_unresolved_orders(
            &self,
            limit: usize,
            excluded: &[OrderNumber],
            older_than: DateTime<Utc>,
            statuses: &[OrderStatusType],
        ) -> Result<Vec<Order>, OrderManagementError>;
        async fn update_order(&self, order: &Order) -> Result<(), OrderManagementError>;
    }

    #[async_trait]
    impl LedgerManagement for LoyaltyDb {
        async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError>;
        async fn sum_for_user(&self, user_id: UserId) -> Result<Points, LedgerError>;
        async fn balance_for_user(&self, user_id: UserId) -> Result<Balance, LedgerError>;
        async fn withdrawals_for_user(&self, user_id: UserId) -> Result<Vec<Withdrawal>, LedgerError>;
        async fn withdrawal_for_order(&self, number: &OrderNumber) -> Result<Option<Withdrawal>, LedgerError>;
    }
}
