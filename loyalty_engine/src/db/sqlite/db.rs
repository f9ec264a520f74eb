use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{ledger, new_pool, orders, SqliteDatabaseError};
use crate::{
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

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date using the migrations embedded in the binary.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }
}

#[async_trait]
impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderManagementError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::insert_order(order, &mut conn).await?)
    }

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_order(number, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithAccrual>, OrderManagementError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_orders_for_user(user_id, &mut conn).await?)
    }

    async fn fetch_unresolved_orders(
        &self,
        limit: usize,
        excluded: &[OrderNumber],
        older_than: DateTime<Utc>,
        statuses: &[OrderStatusType],
    ) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::fetch_unresolved_orders(limit, excluded, older_than, statuses, &mut conn).await?)
    }

    async fn update_order(&self, order: &Order) -> Result<(), OrderManagementError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(orders::update_order(order, &mut conn).await?)
    }
}

#[async_trait]
impl LedgerManagement for SqliteDatabase {
    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(ledger::insert_entry(entry, &mut conn).await?)
    }

    async fn sum_for_user(&self, user_id: UserId) -> Result<Points, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(ledger::sum_for_user(user_id, &mut conn).await?)
    }

    async fn balance_for_user(&self, user_id: UserId) -> Result<Balance, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(ledger::balance_for_user(user_id, &mut conn).await?)
    }

    async fn withdrawals_for_user(&self, user_id: UserId) -> Result<Vec<Withdrawal>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(ledger::withdrawals_for_user(user_id, &mut conn).await?)
    }

    async fn withdrawal_for_order(&self, number: &OrderNumber) -> Result<Option<Withdrawal>, LedgerError> {
        let mut conn = self.pool.acquire().await.map_err(SqliteDatabaseError::from)?;
        Ok(ledger::withdrawal_for_order(number, &mut conn).await?)
    }
}
