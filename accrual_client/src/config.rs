use std::{env, time::Duration};

use log::*;

const DEFAULT_ACCRUAL_URL: &str = "http://localhost:8480";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_PAUSE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// Base address of the accrual service, e.g. `http://localhost:8480`
    pub base_url: String,
    /// Timeout applied to every outbound request
    pub timeout: Duration,
    /// How long to pause when the service rate-limits us without a usable `Retry-After` header
    pub default_pause: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_ACCRUAL_URL.to_string(), timeout: DEFAULT_TIMEOUT, default_pause: DEFAULT_PAUSE }
    }
}

impl AccrualConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = env::var("LPS_ACCRUAL_SYSTEM_ADDRESS").unwrap_or_else(|_| {
            warn!("🪛️ LPS_ACCRUAL_SYSTEM_ADDRESS not set, using {DEFAULT_ACCRUAL_URL} as default");
            DEFAULT_ACCRUAL_URL.to_string()
        });
        let timeout = seconds_from_env("LPS_ACCRUAL_TIMEOUT", DEFAULT_TIMEOUT);
        let default_pause = seconds_from_env("LPS_ACCRUAL_PAUSE", DEFAULT_PAUSE);
        Self { base_url: base_url.trim_end_matches('/').to_string(), timeout, default_pause }
    }
}

fn seconds_from_env(name: &str, default: Duration) -> Duration {
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {}s.", default.as_secs()))
        .and_then(|s| {
            s.parse::<u64>().map(Duration::from_secs).map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}"))
        })
        .ok()
        .unwrap_or(default)
}
