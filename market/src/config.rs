//! Configuration management for the marketplace demo.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Simulated payment processing delay in milliseconds
    /// (`CINESWAP_PAYMENT_DELAY_MS`, default 2000)
    pub payment_delay_ms: u64,
    /// Whether the demo seeds example listings at startup
    /// (`CINESWAP_SEED_DEMO`, default true)
    pub seed_demo_data: bool,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for missing or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            payment_delay_ms: env_parse("CINESWAP_PAYMENT_DELAY_MS", 2000),
            seed_demo_data: env_parse("CINESWAP_SEED_DEMO", true),
        }
    }

    /// The payment delay as a `Duration`
    #[must_use]
    pub const fn payment_delay(&self) -> Duration {
        Duration::from_millis(self.payment_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            payment_delay_ms: 2000,
            seed_demo_data: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_dialog_delay() {
        let config = Config::default();
        assert_eq!(config.payment_delay(), Duration::from_secs(2));
        assert!(config.seed_demo_data);
    }
}
