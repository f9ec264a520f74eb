//! An in-memory backend for the order and ledger traits.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

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

#[derive(Default)]
struct Store {
    orders: HashMap<OrderNumber, Order>,
    ledger: Vec<LedgerEntry>,
    failing_updates: bool,
    failing_credits: bool,
}

/// Behaves like the SQLite backend, including the one-credit and one-debit per order rules. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    store: Arc<Mutex<Store>>,
    ledger_delay: Option<Duration>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every ledger call sleeps for `delay` before touching the store, to widen race windows.
    pub fn with_ledger_delay(mut self, delay: Duration) -> Self {
        self.ledger_delay = Some(delay);
        self
    }

    pub fn fail_order_updates(&self, fail: bool) {
        self.lock().failing_updates = fail;
    }

    pub fn fail_credits(&self, fail: bool) {
        self.lock().failing_credits = fail;
    }

    /// Adds an order directly, bypassing `insert_order`.
    pub fn add_order(&self, order: Order) {
        self.lock().orders.insert(order.number.clone(), order);
    }

    /// Adds an order with the given status, created `age` ago and never checked.
    pub fn add_order_with_age(&self, number: &str, user_id: UserId, status: OrderStatusType, age: Duration) -> Order {
        let created = Utc::now() - chrono::Duration::from_std(age).unwrap_or_else(|_| chrono::Duration::zero());
        let order = Order {
            number: number.into(),
            user_id,
            status,
            created_at: created,
            updated_at: created,
            last_checked_at: None,
        };
        self.add_order(order.clone());
        order
    }

    /// Writes a credit directly, bypassing the trait.
    pub fn credit(&self, user_id: UserId, amount: Points, order: &str) -> LedgerEntry {
        let mut store = self.lock();
        let entry = new_entry(&store, NewLedgerEntry::credit(user_id, amount, order.into()));
        store.ledger.push(entry.clone());
        entry
    }

    pub fn order(&self, number: &str) -> Option<Order> {
        self.lock().orders.get(&OrderNumber::from(number)).cloned()
    }

    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.lock().ledger.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn ledger_pause(&self) {
        if let Some(d) = self.ledger_delay {
            tokio::time::sleep(d).await;
        }
    }
}

fn new_entry(store: &Store, entry: NewLedgerEntry) -> LedgerEntry {
    let now = Utc::now();
    #[allow(clippy::cast_possible_wrap)]
    let id = store.ledger.len() as i64 + 1;
    LedgerEntry {
        id,
        user_id: entry.user_id,
        difference: entry.difference,
        order_number: entry.order_number,
        created_at: now,
        updated_at: now,
    }
}

fn as_withdrawal(entry: &LedgerEntry) -> Option<Withdrawal> {
    match (&entry.order_number, entry.difference.is_negative()) {
        (Some(n), true) => {
            Some(Withdrawal { order_number: n.clone(), sum: entry.difference.abs(), processed_at: entry.created_at })
        },
        _ => None,
    }
}

#[async_trait]
impl OrderManagement for MemoryDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderManagementError> {
        let mut store = self.lock();
        if store.orders.contains_key(&order.number) {
            return Err(OrderManagementError::OrderAlreadyExists(order.number));
        }
        let now = Utc::now();
        let order = Order {
            number: order.number,
            user_id: order.user_id,
            status: OrderStatusType::New,
            created_at: now,
            updated_at: now,
            last_checked_at: None,
        };
        store.orders.insert(order.number.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, number: &OrderNumber) -> Result<Option<Order>, OrderManagementError> {
        Ok(self.lock().orders.get(number).cloned())
    }

    async fn fetch_orders_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithAccrual>, OrderManagementError> {
        let store = self.lock();
        let mut orders = store
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .map(|o| OrderWithAccrual {
                number: o.number.clone(),
                status: o.status,
                accrual: store
                    .ledger
                    .iter()
                    .find(|e| e.difference.is_positive() && e.order_number.as_ref() == Some(&o.number))
                    .map(|e| e.difference),
                uploaded_at: o.created_at,
            })
            .collect::<Vec<_>>();
        orders.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(orders)
    }

    async fn fetch_unresolved_orders(
        &self,
        limit: usize,
        excluded: &[OrderNumber],
        older_than: DateTime<Utc>,
        statuses: &[OrderStatusType],
    ) -> Result<Vec<Order>, OrderManagementError> {
        let store = self.lock();
        let mut orders = store
            .orders
            .values()
            .filter(|o| statuses.contains(&o.status))
            .filter(|o| !excluded.contains(&o.number))
            .filter(|o| o.last_activity() < older_than)
            .cloned()
            .collect::<Vec<_>>();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        orders.truncate(limit);
        Ok(orders)
    }

    async fn update_order(&self, order: &Order) -> Result<(), OrderManagementError> {
        let mut store = self.lock();
        if store.failing_updates {
            return Err(OrderManagementError::DatabaseError("update failed".into()));
        }
        match store.orders.get_mut(&order.number) {
            Some(o) => {
                o.status = order.status;
                o.last_checked_at = order.last_checked_at;
                o.updated_at = Utc::now();
                Ok(())
            },
            None => Err(OrderManagementError::OrderNotFound(order.number.clone())),
        }
    }
}

#[async_trait]
impl LedgerManagement for MemoryDatabase {
    async fn insert_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, LedgerError> {
        self.ledger_pause().await;
        let mut store = self.lock();
        if store.failing_credits && entry.is_credit() {
            return Err(LedgerError::DatabaseError("credit failed".into()));
        }
        if let Some(number) = &entry.order_number {
            let credit = entry.is_credit();
            let duplicate = store.ledger.iter().any(|e| {
                e.order_number.as_ref() == Some(number) &&
                    e.difference.value() != 0 &&
                    e.difference.is_positive() == credit
            });
            match (duplicate, credit) {
                (true, true) => return Err(LedgerError::DuplicateCredit(number.clone())),
                (true, false) => return Err(LedgerError::DuplicateWithdrawal(number.clone())),
                _ => {},
            }
        }
        let entry = new_entry(&store, entry);
        store.ledger.push(entry.clone());
        Ok(entry)
    }

    async fn sum_for_user(&self, user_id: UserId) -> Result<Points, LedgerError> {
        self.ledger_pause().await;
        Ok(self.lock().ledger.iter().filter(|e| e.user_id == user_id).map(|e| e.difference).sum())
    }

    async fn balance_for_user(&self, user_id: UserId) -> Result<Balance, LedgerError> {
        let store = self.lock();
        let entries = store.ledger.iter().filter(|e| e.user_id == user_id);
        let (current, withdrawn) = entries.fold((Points::default(), Points::default()), |(c, w), e| {
            let w = if e.difference.is_negative() { w + e.difference.abs() } else { w };
            (c + e.difference, w)
        });
        Ok(Balance { current, withdrawn })
    }

    async fn withdrawals_for_user(&self, user_id: UserId) -> Result<Vec<Withdrawal>, LedgerError> {
        let store = self.lock();
        let mut withdrawals =
            store.ledger.iter().rev().filter(|e| e.user_id == user_id).filter_map(as_withdrawal).collect::<Vec<_>>();
        withdrawals.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(withdrawals)
    }

    async fn withdrawal_for_order(&self, number: &OrderNumber) -> Result<Option<Withdrawal>, LedgerError> {
        let store = self.lock();
        Ok(store.ledger.iter().filter(|e| e.order_number.as_ref() == Some(number)).find_map(as_withdrawal))
    }
}
