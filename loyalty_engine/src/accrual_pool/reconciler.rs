use chrono::Utc;
use log::*;
use tokio::sync::watch;

use super::{cancelled, AccrualPool, PoolError};
use crate::db_types::{Order, OrderNumber, OrderStatusType};

/// Periodically re-queues unresolved orders that have not been checked for a while. The first pass runs immediately,
/// which picks up whatever was left over from a previous run.
pub(super) async fn run_reconciler(pool: AccrualPool, mut cancel: watch::Receiver<bool>) {
    let mut timer = tokio::time::interval(pool.config().reconcile_interval);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!("🔄️ Order reconciler started");
    loop {
        tokio::select! {
            _ = cancelled(&mut cancel) => break,
            _ = timer.tick() => {},
        }
        match reconcile(&pool).await {
            Ok(0) => trace!("🔄️ No stale orders found"),
            Ok(n) => debug!("🔄️ Re-queued {n} stale orders"),
            Err(PoolError::Closed) => break,
        }
    }
    info!("🔄️ Order reconciler stopped");
}

/// Runs a single reconciliation pass and returns the number of orders that were queued.
pub(super) async fn reconcile(pool: &AccrualPool) -> Result<usize, PoolError> {
    let (limit, excluded) = {
        let state = pool.inner.state.read().await;
        let limit = state.queue.as_ref().map(|q| q.capacity()).ok_or(PoolError::Closed)?;
        (limit, state.orders.keys().cloned().collect::<Vec<OrderNumber>>())
    };
    if limit == 0 {
        trace!("🔄️ The queue is full. Skipping this reconciliation pass");
        return Ok(0);
    }
    let stale_after = chrono::Duration::from_std(pool.config().stale_after).unwrap_or_else(|_| chrono::Duration::zero());
    let older_than = Utc::now() - stale_after;
    let orders =
        match pool.inner.orders.fetch_unresolved_orders(limit, &excluded, older_than, &OrderStatusType::UNRESOLVED).await
        {
            Ok(orders) => orders,
            Err(e) => {
                error!("🔄️ Could not fetch unresolved orders. {e}");
                return Ok(0);
            },
        };
    if !orders.is_empty() {
        debug!("🔄️ Found stale orders: {}", order_list(&orders));
    }
    let mut queued = 0;
    for order in orders {
        if !pool.push(order).await? {
            debug!("🔄️ The queue filled up during reconciliation");
            break;
        }
        queued += 1;
    }
    Ok(queued)
}

fn order_list(orders: &[Order]) -> String {
    orders.iter().map(|o| format!("{} ({})", o.number, o.status)).collect::<Vec<String>>().join(", ")
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        accrual_pool::PoolConfig,
        test_utils::{memory_db::MemoryDatabase, scripted_accrual::ScriptedAccrual},
    };

    fn idle_pool(db: &MemoryDatabase, capacity: usize) -> AccrualPool {
        let _ = env_logger::try_init();
        let config = PoolConfig {
            queue_capacity: capacity,
            worker_count: 0,
            reconcile_interval: Duration::from_secs(3600),
            stale_after: Duration::from_secs(60),
        };
        let (_, rx) = watch::channel(false);
        AccrualPool::start(config, Arc::new(db.clone()), Arc::new(db.clone()), Arc::new(ScriptedAccrual::new()), rx)
    }

    #[tokio::test]
    async fn only_stale_unresolved_orders_are_queued() {
        let db = MemoryDatabase::new();
        let hour = Duration::from_secs(3600);
        db.add_order_with_age("1", 1, OrderStatusType::New, hour);
        db.add_order_with_age("2", 1, OrderStatusType::Processing, hour);
        db.add_order_with_age("3", 1, OrderStatusType::Invalid, hour);
        db.add_order_with_age("4", 1, OrderStatusType::Processed, hour);
        db.add_order_with_age("5", 1, OrderStatusType::New, Duration::ZERO);
        let pool = idle_pool(&db, 10);
        // Let the start-up pass run, then check what it left behind
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.tracked_count().await, 2);
        assert_eq!(reconcile(&pool).await, Ok(0));
        let state = pool.inner.state.read().await;
        assert!(state.orders.contains_key(&OrderNumber::from("1")));
        assert!(state.orders.contains_key(&OrderNumber::from("2")));
    }

    #[tokio::test]
    async fn reconciliation_respects_queue_capacity() {
        let db = MemoryDatabase::new();
        let hour = Duration::from_secs(3600);
        for n in 1..=5 {
            db.add_order_with_age(&n.to_string(), 1, OrderStatusType::New, hour);
        }
        let pool = idle_pool(&db, 2);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.tracked_count().await, 2);
        assert_eq!(pool.remaining_capacity().await, 0);
        assert_eq!(reconcile(&pool).await, Ok(0));
    }

    #[tokio::test]
    async fn closed_pool_stops_reconciliation() {
        let db = MemoryDatabase::new();
        let pool = idle_pool(&db, 2);
        pool.close().await;
        assert_eq!(reconcile(&pool).await, Err(PoolError::Closed));
    }
}
