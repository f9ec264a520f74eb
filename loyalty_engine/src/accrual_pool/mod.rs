//! # Order accrual pool
//!
//! The pool drives submitted orders through the accrual lifecycle. It is made up of
//! * a bounded queue of order numbers, with a dedup map recording which orders are queued or being worked on,
//! * a fixed set of worker tasks that pull numbers off the queue, ask the accrual service about them and write the
//!   results back (see [`worker`]), and
//! * a reconciler task that periodically finds stale, unresolved orders in the database and pushes them back into the
//!   queue, so that nothing is lost across restarts or rejected pushes (see [`reconciler`]).
//!
//! [`AccrualPool::push`] never waits for queue space. A full queue is reported as `Ok(false)`, and the order is left
//! for the reconciler to pick up later.
//!
//! All tasks share a cancellation channel. [`AccrualPool::close`] fires it, waits for every task to finish and then
//! closes the queue. The pool also closes itself when the shutdown signal it was started with fires.
mod reconciler;
mod worker;

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use futures_util::future::join_all;
use log::*;
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch, Mutex as AsyncMutex, RwLock},
    task::JoinHandle,
};

use crate::{
    db_types::{Order, OrderNumber},
    traits::{AccrualChecker, LedgerManagement, OrderManagement},
};

const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_WORKER_COUNT: usize = 4;
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("The accrual pool is closed")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// The maximum number of order numbers waiting in the queue
    pub queue_capacity: usize,
    /// The number of worker tasks
    pub worker_count: usize,
    /// How often the reconciler looks for stale orders
    pub reconcile_interval: Duration,
    /// How long an order must have gone unchecked before the reconciler picks it up
    pub stale_after: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            stale_after: DEFAULT_STALE_AFTER,
        }
    }
}

/// An order tracked by the pool, and whether a worker has claimed it.
#[derive(Debug, Clone)]
pub struct WorkedOrder {
    pub order: Order,
    pub in_work: bool,
}

struct PoolState {
    orders: HashMap<OrderNumber, WorkedOrder>,
    // `None` once the pool has been closed
    queue: Option<mpsc::Sender<OrderNumber>>,
}

struct PoolInner {
    config: PoolConfig,
    orders: Arc<dyn OrderManagement>,
    ledger: Arc<dyn LedgerManagement>,
    checker: Arc<dyn AccrualChecker>,
    state: RwLock<PoolState>,
    receiver: AsyncMutex<mpsc::Receiver<OrderNumber>>,
    closing: AtomicBool,
    cancel: watch::Sender<bool>,
    // Set to `true` once `close` has drained every task and dropped the queue
    closed: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to a running accrual pool. Clones refer to the same pool.
#[derive(Clone)]
pub struct AccrualPool {
    inner: Arc<PoolInner>,
}

impl AccrualPool {
    /// Creates the pool and starts its workers, the reconciler, and a watcher that closes the pool once `shutdown`
    /// becomes `true`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: PoolConfig,
        orders: Arc<dyn OrderManagement>,
        ledger: Arc<dyn LedgerManagement>,
        checker: Arc<dyn AccrualChecker>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (cancel, _) = watch::channel(false);
        let (closed, _) = watch::channel(false);
        let inner = PoolInner {
            config,
            orders,
            ledger,
            checker,
            state: RwLock::new(PoolState { orders: HashMap::new(), queue: Some(sender) }),
            receiver: AsyncMutex::new(receiver),
            closing: AtomicBool::new(false),
            cancel,
            closed,
            tasks: Mutex::new(Vec::new()),
        };
        let pool = Self { inner: Arc::new(inner) };
        let mut tasks = Vec::with_capacity(pool.inner.config.worker_count + 1);
        for id in 0..pool.inner.config.worker_count {
            tasks.push(tokio::spawn(worker::run_worker(id, pool.clone(), pool.cancel_signal())));
        }
        tasks.push(tokio::spawn(reconciler::run_reconciler(pool.clone(), pool.cancel_signal())));
        *pool.lock_tasks() = tasks;
        // The watcher is not tracked with the other tasks, since it is the one calling `close`.
        tokio::spawn(watch_for_shutdown(pool.clone(), shutdown));
        info!(
            "🔄️ Accrual pool started with {} workers and a queue of {}",
            pool.inner.config.worker_count, pool.inner.config.queue_capacity
        );
        pool
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closing.load(Ordering::SeqCst)
    }

    /// Offers an order to the pool.
    ///
    /// Returns `Ok(true)` if the order was queued or is already being tracked, and `Ok(false)` if the queue is full.
    /// Never waits for queue space.
    pub async fn push(&self, order: Order) -> Result<bool, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }
        let mut state = self.inner.state.write().await;
        let queue = state.queue.clone().ok_or(PoolError::Closed)?;
        if state.orders.contains_key(&order.number) {
            trace!("🔄️ Order {} is already tracked", order.number);
            return Ok(true);
        }
        if queue.capacity() == 0 {
            debug!("🔄️ Queue is full. Order {} was not accepted", order.number);
            return Ok(false);
        }
        let number = order.number.clone();
        match queue.try_send(number.clone()) {
            Ok(()) => {
                state.orders.insert(number.clone(), WorkedOrder { order, in_work: false });
                trace!("🔄️ Order {number} queued");
                Ok(true)
            },
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PoolError::Closed),
        }
    }

    /// The number of orders currently queued or being worked on.
    pub async fn tracked_count(&self) -> usize {
        self.inner.state.read().await.orders.len()
    }

    /// Free slots in the queue. Zero once the pool is closed.
    pub async fn remaining_capacity(&self) -> usize {
        self.inner.state.read().await.queue.as_ref().map(|q| q.capacity()).unwrap_or(0)
    }

    /// Stops the pool. Waits for every worker and the reconciler to finish, then closes the queue. Calling `close`
    /// more than once is harmless; every caller returns only after the pool has been fully drained.
    pub async fn close(&self) {
        if self.inner.closing.swap(true, Ordering::SeqCst) {
            let mut closed = self.inner.closed.subscribe();
            cancelled(&mut closed).await;
            return;
        }
        info!("🔄️ Closing the accrual pool");
        let _ = self.inner.cancel.send(true);
        let tasks = std::mem::take(&mut *self.lock_tasks());
        for result in join_all(tasks).await {
            if let Err(e) = result {
                error!("🔄️ Accrual pool task ended abnormally. {e}");
            }
        }
        self.inner.state.write().await.queue = None;
        self.inner.closed.send_replace(true);
        info!("🔄️ Accrual pool closed");
    }

    /// Marks the order as in-work. Returns the order if this call claimed it, and `None` if the order is unknown or
    /// someone else already holds it.
    pub(crate) async fn claim(&self, number: &OrderNumber) -> Option<Order> {
        let mut state = self.inner.state.write().await;
        match state.orders.get_mut(number) {
            Some(worked) if !worked.in_work => {
                worked.in_work = true;
                Some(worked.order.clone())
            },
            _ => None,
        }
    }

    /// Gives up the claim on the order and stops tracking it, so the reconciler may pick it up again once it is stale.
    pub(crate) async fn release(&self, number: &OrderNumber) {
        self.inner.state.write().await.orders.remove(number);
    }

    fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.inner.cancel.subscribe()
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner.tasks.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Resolves once the watched value becomes `true`. Never resolves if the sender goes away first.
async fn cancelled(signal: &mut watch::Receiver<bool>) {
    if signal.wait_for(|v| *v).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn watch_for_shutdown(pool: AccrualPool, mut shutdown: watch::Receiver<bool>) {
    let mut own_cancel = pool.cancel_signal();
    tokio::select! {
        _ = cancelled(&mut shutdown) => {
            info!("🔄️ Shutdown signal received");
            pool.close().await;
        },
        _ = cancelled(&mut own_cancel) => {},
    }
}
