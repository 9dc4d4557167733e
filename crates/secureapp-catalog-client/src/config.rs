//! External catalog client configuration.
//!
//! Points at the external product service. Override via environment
//! variables or explicit construction for tests.

use std::time::Duration;

use url::Url;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for connecting to the external product service.
#[derive(Debug, Clone)]
pub struct ExternalCatalogConfig {
    /// Base URL of the service, e.g. `http://localhost:8089`.
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// How lookups ride out an unreachable service.
    pub retry: RetryPolicy,
}

/// Backoff schedule for lookups that never reached the service.
///
/// The delay before retry `n` (0-based) is `base_delay * 2^n`, capped at
/// `max_delay`. A policy with `max_retries == 0` sends each request once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Send every request exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay to wait before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Total number of attempts a request may take.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl ExternalCatalogConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `EXTERNAL_CATALOG_URL` (required)
    /// - `EXTERNAL_CATALOG_TIMEOUT_SECS` (default: 10)
    /// - `EXTERNAL_CATALOG_MAX_RETRIES` (default: 3)
    /// - `EXTERNAL_CATALOG_RETRY_BASE_MS` (default: 200)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = lookup("EXTERNAL_CATALOG_URL").ok_or(ConfigError::MissingUrl)?;
        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("EXTERNAL_CATALOG_URL".to_string(), e.to_string()))?;

        let number = |name: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(name)
                .map(|raw| raw.trim().parse().map_err(|_| ConfigError::Invalid(name, raw)))
                .transpose()
        };

        let mut retry = RetryPolicy::default();
        if let Some(n) = number("EXTERNAL_CATALOG_MAX_RETRIES")? {
            retry.max_retries = u32::try_from(n)
                .map_err(|_| ConfigError::Invalid("EXTERNAL_CATALOG_MAX_RETRIES", n.to_string()))?;
        }
        if let Some(ms) = number("EXTERNAL_CATALOG_RETRY_BASE_MS")? {
            retry.base_delay = Duration::from_millis(ms);
        }

        Ok(Self {
            base_url,
            timeout_secs: number("EXTERNAL_CATALOG_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
            retry,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("EXTERNAL_CATALOG_URL environment variable is required")]
    MissingUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<ExternalCatalogConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ExternalCatalogConfig::from_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn new_uses_defaults() {
        let cfg = ExternalCatalogConfig::new(Url::parse("http://catalog.internal").unwrap());
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.retry, RetryPolicy::default());
    }

    #[test]
    fn url_is_required() {
        assert!(matches!(from_vars(&[]), Err(ConfigError::MissingUrl)));
        assert!(matches!(
            from_vars(&[("EXTERNAL_CATALOG_URL", "not a url")]),
            Err(ConfigError::InvalidUrl(..))
        ));
    }

    #[test]
    fn retry_settings_come_from_environment() {
        let cfg = from_vars(&[
            ("EXTERNAL_CATALOG_URL", "http://localhost:8089"),
            ("EXTERNAL_CATALOG_MAX_RETRIES", "5"),
            ("EXTERNAL_CATALOG_RETRY_BASE_MS", "50"),
            ("EXTERNAL_CATALOG_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.retry.max_retries, 5);
        assert_eq!(cfg.retry.base_delay, Duration::from_millis(50));
        assert_eq!(cfg.timeout_secs, 3);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(matches!(
            from_vars(&[
                ("EXTERNAL_CATALOG_URL", "http://localhost:8089"),
                ("EXTERNAL_CATALOG_MAX_RETRIES", "many"),
            ]),
            Err(ConfigError::Invalid("EXTERNAL_CATALOG_MAX_RETRIES", _))
        ));
    }

    #[test]
    fn delays_double_then_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for(2), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_secs(2));
        assert_eq!(policy.delay_for(40), Duration::from_secs(2));
    }

    #[test]
    fn no_retry_policy_makes_one_attempt() {
        assert_eq!(RetryPolicy::none().attempts(), 1);
        assert_eq!(RetryPolicy::default().attempts(), 4);
    }
}
