use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderNumber, OrderStatusType, OrderWithAccrual, UserId};

#[derive(Debug, Clone, Error)]
pub enum OrderManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderNumber),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
}

/// The `OrderManagement` trait defines the behaviour for storing and querying orders in the database backend.
#[async_trait]
pub trait OrderManagement: Send + Sync {
    /// Stores a brand-new order with status `NEW`. Fails with [`OrderManagementError::OrderAlreadyExists`] if the
    /// number is taken, regardless of who owns it.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderManagementError>;

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderManagementError>;

    /// All of the user's orders, newest first, each with the points it earned.
    async fn fetch_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithAccrual>, OrderManagementError>;

    /// Fetches at most `limit` orders whose status is one of `statuses`, whose number is not in `excluded`, and whose
    /// last check (or creation, if never checked) happened before `older_than`. Oldest orders come first.
    async fn fetch_unresolved_orders(
        &self,
        limit: usize,
        excluded: &[OrderNumber],
        older_than: DateTime<Utc>,
        statuses: &[OrderStatusType],
    ) -> Result<Vec<Order>, OrderManagementError>;

    /// Persists the status and last-checked time of the order.
    async fn update_order(&self, order: &Order) -> Result<(), OrderManagementError>;
}
