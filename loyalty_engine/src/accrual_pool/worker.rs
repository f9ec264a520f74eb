//! Worker tasks. Each worker takes order numbers off the queue, asks the accrual service about them and applies the
//! answer to the order and the ledger.
use std::ops::ControlFlow;

use accrual_client::{AccrualApiError, AccrualResponse, AccrualStatus};
use chrono::Utc;
use log::*;
use tokio::sync::watch;

use super::{cancelled, AccrualPool};
use crate::{
    db_types::{NewLedgerEntry, Order, OrderStatusType},
    traits::LedgerError,
};

pub(super) async fn run_worker(id: usize, pool: AccrualPool, mut cancel: watch::Receiver<bool>) {
    debug!("🔄️ Worker {id} started");
    loop {
        let next = tokio::select! {
            _ = cancelled(&mut cancel) => break,
            next = async { pool.inner.receiver.lock().await.recv().await } => next,
        };
        let Some(number) = next else {
            break;
        };
        let Some(order) = pool.claim(&number).await else {
            trace!("🔄️ Worker {id}: order {number} is already claimed");
            continue;
        };
        let flow = process_order(id, &pool, order, &mut cancel).await;
        pool.release(&number).await;
        if flow.is_break() {
            break;
        }
    }
    debug!("🔄️ Worker {id} stopped");
}

/// Checks a single claimed order. Returns `Break` if the pool was cancelled while waiting out a rate limit.
async fn process_order(
    id: usize,
    pool: &AccrualPool,
    order: Order,
    cancel: &mut watch::Receiver<bool>,
) -> ControlFlow<()> {
    let checker = &pool.inner.checker;
    match checker.check_accrual(&order.number).await {
        Ok(response) => apply_response(pool, order, response).await,
        Err(AccrualApiError::RateLimited { pause }) => {
            warn!("🔄️ Worker {id}: the accrual service is rate limiting us. Pausing all checks for {pause:?}");
            tokio::select! {
                _ = cancelled(cancel) => return ControlFlow::Break(()),
                _ = checker.pause(pause) => {},
            }
        },
        Err(e) if e.is_transient() => {
            debug!("🔄️ Worker {id}: order {} is not ready yet. {e}", order.number);
        },
        Err(e) => {
            warn!("🔄️ Worker {id}: could not check order {}. {e}", order.number);
        },
    }
    ControlFlow::Continue(())
}

/// Maps an accrual answer to the order's new status, crediting the user on `PROCESSED`.
///
/// | accrual status          | order status | ledger                          |
/// |-------------------------|--------------|---------------------------------|
/// | REGISTERED, PROCESSING  | PROCESSING   | none                            |
/// | INVALID                 | INVALID      | none                            |
/// | PROCESSED               | PROCESSED    | credit of the accrual, if any   |
///
/// Moves out of a terminal status are ignored, and no credit is written for them. Otherwise the check time is recorded.
/// If the credit fails the order is left alone so it is retried later.
pub(super) async fn apply_response(pool: &AccrualPool, mut order: Order, response: AccrualResponse) {
    let new_status = match response.status {
        AccrualStatus::Registered | AccrualStatus::Processing => OrderStatusType::Processing,
        AccrualStatus::Invalid => OrderStatusType::Invalid,
        AccrualStatus::Processed => OrderStatusType::Processed,
    };
    if order.status != new_status && !order.status.can_transition_to(new_status) {
        warn!("🔄️ Ignoring the move of order {} from {} to {new_status}", order.number, order.status);
        return;
    }
    if new_status == OrderStatusType::Processed && !credit_order(pool, &order, &response).await {
        return;
    }
    let old_status = order.status;
    order.status = new_status;
    order.last_checked_at = Some(Utc::now());
    match pool.inner.orders.update_order(&order).await {
        Ok(()) if old_status != new_status => {
            info!("🔄️ Order {} moved from {old_status} to {new_status}", order.number);
        },
        Ok(()) => trace!("🔄️ Order {} is still {new_status}", order.number),
        Err(e) => error!("🔄️ Could not update order {}. {e}", order.number),
    }
}

/// Returns `true` if the order is safe to mark as processed.
async fn credit_order(pool: &AccrualPool, order: &Order, response: &AccrualResponse) -> bool {
    let accrual = response.accrual_or_zero();
    if !accrual.is_positive() {
        debug!("🔄️ Order {} was processed without an accrual", order.number);
        return true;
    }
    let entry = NewLedgerEntry::credit(order.user_id, accrual, order.number.clone());
    match pool.inner.ledger.insert_ledger_entry(entry).await {
        Ok(_) => {
            info!("🧾️ Credited {accrual} to user #{} for order {}", order.user_id, order.number);
            true
        },
        Err(LedgerError::DuplicateCredit(n)) => {
            debug!("🧾️ Order {n} was already credited");
            true
        },
        Err(e) => {
            error!("🧾️ Could not credit user #{} for order {}. {e}", order.user_id, order.number);
            false
        },
    }
}
