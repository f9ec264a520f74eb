use std::{env, fmt::Display, str::FromStr, time::Duration};

use accrual_client::AccrualConfig;
use log::*;
use loyalty_common::{parse_boolean_flag, Secret};
use loyalty_engine::accrual_pool::PoolConfig;

const DEFAULT_LPS_HOST: &str = "127.0.0.1";
const DEFAULT_LPS_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyalty.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Secret<String>,
    pub max_connections: u32,
    /// Apply the embedded migrations before serving requests
    pub run_migrations: bool,
    /// Where and how to reach the accrual service
    pub accrual: AccrualConfig,
    /// Queue size, worker count and reconciliation timing for the accrual pool
    pub pool: PoolConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LPS_HOST.to_string(),
            port: DEFAULT_LPS_PORT,
            database_url: Secret::new(DEFAULT_DATABASE_URL.to_string()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            run_migrations: true,
            accrual: AccrualConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let host = env::var("LPS_HOST").ok().unwrap_or_else(|| DEFAULT_LPS_HOST.into());
        let port = parse_or_default("LPS_PORT", env::var("LPS_PORT").ok(), DEFAULT_LPS_PORT);
        let database_url = env::var("LPS_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ LPS_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_or_default(
            "LPS_DATABASE_MAX_CONNECTIONS",
            env::var("LPS_DATABASE_MAX_CONNECTIONS").ok(),
            DEFAULT_MAX_CONNECTIONS,
        );
        let run_migrations = parse_boolean_flag(env::var("LPS_RUN_MIGRATIONS").ok(), true);
        let pool = PoolConfig {
            queue_capacity: parse_or_default("LPS_QUEUE_SIZE", env::var("LPS_QUEUE_SIZE").ok(), defaults.pool.queue_capacity),
            worker_count: parse_or_default("LPS_WORKER_COUNT", env::var("LPS_WORKER_COUNT").ok(), defaults.pool.worker_count),
            reconcile_interval: seconds_or_default(
                "LPS_RECONCILE_INTERVAL",
                env::var("LPS_RECONCILE_INTERVAL").ok(),
                defaults.pool.reconcile_interval,
            ),
            stale_after: seconds_or_default(
                "LPS_STALE_ORDER_AGE",
                env::var("LPS_STALE_ORDER_AGE").ok(),
                defaults.pool.stale_after,
            ),
        };
        if pool.queue_capacity == 0 {
            warn!("🪛️ LPS_QUEUE_SIZE is zero. The accrual queue will hold a single order.");
        }
        let accrual = AccrualConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url: Secret::new(database_url),
            max_connections,
            run_migrations,
            accrual,
            pool,
        }
    }
}

fn parse_or_default<T>(name: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match value {
        None => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn seconds_or_default(name: &str, value: Option<String>, default: Duration) -> Duration {
    Duration::from_secs(parse_or_default(name, value, default.as_secs()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numbers_fall_back_to_defaults() {
        assert_eq!(parse_or_default("X", None, 8080u16), 8080);
        assert_eq!(parse_or_default("X", Some(" 9000 ".into()), 8080u16), 9000);
        assert_eq!(parse_or_default("X", Some("70000".into()), 8080u16), 8080);
        assert_eq!(parse_or_default("X", Some("lots".into()), 4usize), 4);
    }

    #[test]
    fn durations_are_in_seconds() {
        let d = Duration::from_secs(5);
        assert_eq!(seconds_or_default("X", Some("30".into()), d), Duration::from_secs(30));
        assert_eq!(seconds_or_default("X", Some("-1".into()), d), d);
        assert_eq!(seconds_or_default("X", None, d), d);
    }

    #[test]
    fn database_url_is_not_printed() {
        let config = ServerConfig::new("0.0.0.0", 1234);
        let printed = format!("{config:?}");
        assert!(printed.contains("****"));
        assert!(!printed.contains("loyalty.db"));
        assert_eq!(config.database_url.reveal(), DEFAULT_DATABASE_URL);
    }
}
