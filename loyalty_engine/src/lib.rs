//! Loyalty Engine
//!
//! The loyalty engine turns purchase order numbers into loyalty points. Users submit order numbers; an external
//! accrual service decides how many points each order earns; the engine keeps a ledger of credits and debits from
//! which every balance is derived.
//!
//! The library is divided into these main sections:
//! 1. Database management and control ([`traits`] and the SQLite backend). You should never need to access the
//!    database directly. The exception is the data types used in the database. These are defined in the [`db_types`]
//!    module and are public.
//! 2. The accrual pool ([`accrual_pool`]), a bounded queue of orders worked on by a fixed set of tasks that poll the
//!    accrual service and credit users, plus a reconciler that re-queues stale orders.
//! 3. Balance handling ([`balance_service`] and [`user_locks`]). Debits for a user are serialised so that a balance
//!    can never go negative.
//! 4. The public API ([`OrderFlowApi`] and [`AccountApi`]), which is what the HTTP server talks to.
mod db;

pub mod accrual_pool;
pub mod balance_service;
pub mod db_types;
mod loyalty_api;
pub mod user_locks;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits;
pub use loyalty_api::{
    accounts_api::AccountApi,
    errors::{AccountApiError, OrderFlowError},
    order_flow_api::OrderFlowApi,
    order_objects,
};
