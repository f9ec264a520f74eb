//! Helpers for tests: a throwaway SQLite database, an in-memory backend and a scripted accrual service.
pub mod memory_db;
#[cfg(feature = "sqlite")]
pub mod prepare_env;
pub mod scripted_accrual;
