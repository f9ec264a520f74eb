//! Client for the external accrual service.
//!
//! The accrual service tells us whether an order earns loyalty points, and how many. It is rate limited, so the
//! [`AccrualProxy`] also owns a shared pause clock: when the service answers `429 Too Many Requests`, the caller
//! engages [`AccrualProxy::pause`] and every other request waits until the pause has elapsed.
mod api;
mod config;
mod data_objects;
mod error;
pub mod helpers;

pub use api::AccrualProxy;
pub use config::AccrualConfig;
pub use data_objects::{AccrualResponse, AccrualStatus};
pub use error::AccrualApiError;
pub use helpers::parse_retry_after;
