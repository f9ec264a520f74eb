//! #  Database management and control.
//!
//! This module provides the interface contracts that the loyalty engine expects from its collaborators. The accrual
//! pool and the balance service only ever see these traits, so that any backend (or an in-memory fake) can be
//! substituted.
//!
//! * [`OrderManagement`] stores orders and lets the reconciler find the ones that still need attention.
//! * [`LedgerManagement`] is the append-only points ledger. Balances are always derived from it.
//! * [`AccrualChecker`] asks the external accrual service about an order, and honours its rate limits.
mod accrual_checker;
mod ledger_management;
mod order_management;

pub use accrual_checker::AccrualChecker;
pub use ledger_management::{LedgerError, LedgerManagement};
pub use order_management::{OrderManagement, OrderManagementError};
