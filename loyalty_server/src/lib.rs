//! # Loyalty points server
//! This crate hosts the HTTP server for the loyalty engine. It is responsible for:
//! * accepting order numbers from users and handing them to the accrual pool,
//! * reporting balances, orders and withdrawal histories, and
//! * letting users spend their points.
//!
//! Users are identified by the `X-User-Id` header, set by the authenticating gateway in front of this server.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /api/user/orders`: Submit an order number (plain text body).
//! * `GET /api/user/orders`: The caller's orders and the points they earned.
//! * `GET /api/user/balance`: The caller's current balance and total withdrawals.
//! * `POST /api/user/balance/withdraw`: Spend points against an order number.
//! * `GET /api/user/withdrawals`: The caller's withdrawal history.
pub mod cli;
pub mod config;
pub mod errors;

pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
