//! # Loyalty engine public API
//!
//! The `loyalty_api` module is what the HTTP layer talks to. Like the rest of the engine it is backend-agnostic: an
//! API instance is created by supplying a database backend that implements the traits the API needs.
//!
//! * [`order_flow_api`] accepts order submissions and withdrawals. Submissions are handed to the accrual pool;
//!   withdrawals go through the balance service.
//! * [`accounts_api`] answers read-only questions about a user: balance, orders and withdrawal history.
//!
//! ```rust,ignore
//! use loyalty_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = AccountApi::new(db);
//! let balance = api.balance(user_id).await?;
//! ```
pub mod accounts_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
