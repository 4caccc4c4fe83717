//! Application configuration. Provider credentials, dispatch tuning, retry policy.
//!
//! Loaded once at startup and never mutated.

use serde::Deserialize;
use std::time::Duration;

/// Default provider base URL (WhatsApp Cloud API via Graph).
pub const DEFAULT_API_URL: &str = "https://graph.facebook.com/v18.0";
/// Region used for numbers typed without a country code.
pub const DEFAULT_REGION: &str = "PK";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENT_SENDS: usize = 5;
/// Upper bound on concurrent member sends, whatever the configuration says.
pub const MAX_CONCURRENT_SENDS_LIMIT: usize = 10;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 2000;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Provider base URL. Read from WA_DISPATCH_API_URL or WHATSAPP_API_URL.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Bearer token. Read from WA_DISPATCH_API_TOKEN or WHATSAPP_API_TOKEN.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Sender phone-number id used in `/{id}/messages`. Read from WHATSAPP_PHONE_NUMBER_ID.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Business account id. Informational only. Read from WHATSAPP_BUSINESS_ACCOUNT_ID.
    #[serde(default)]
    pub business_account_id: Option<String>,

    /// ISO 3166 alpha-2 region for numbers without a country code (default PK).
    #[serde(default)]
    pub default_region: Option<String>,

    /// Per-call provider timeout in seconds (default 10).
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Concurrent member sends during fan-out (default 5, clamped to 1..=10).
    #[serde(default)]
    pub max_concurrent_sends: Option<usize>,

    /// Total attempts per member for transient failures (default 1 = no retry).
    #[serde(default)]
    pub retry_max_attempts: Option<u32>,

    /// Backoff before the first retry round in ms; doubles each round (default 2000).
    #[serde(default)]
    pub retry_backoff_ms: Option<u64>,

    /// Optional JSON numbering plan replacing the built-in table.
    #[serde(default)]
    pub numbering_plan_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("WA_DISPATCH"));
        if let Ok(path) = std::env::var("WA_DISPATCH_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let cfg: Self = c.build()?.try_deserialize()?;
        Ok(cfg)
    }

    /// Provider base URL. Falls back to WHATSAPP_API_URL, then the Graph default.
    pub fn api_url_or_default(&self) -> String {
        self.api_url
            .clone()
            .or_else(|| std::env::var("WHATSAPP_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Bearer token from config or WHATSAPP_API_TOKEN.
    pub fn api_token(&self) -> Option<String> {
        self.api_token
            .clone()
            .or_else(|| std::env::var("WHATSAPP_API_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }

    /// Sender phone-number id from config or WHATSAPP_PHONE_NUMBER_ID.
    pub fn phone_number_id(&self) -> Option<String> {
        self.phone_number_id
            .clone()
            .or_else(|| std::env::var("WHATSAPP_PHONE_NUMBER_ID").ok())
            .filter(|id| !id.trim().is_empty())
    }

    /// Business account id from config or WHATSAPP_BUSINESS_ACCOUNT_ID.
    pub fn business_account_id(&self) -> Option<String> {
        self.business_account_id
            .clone()
            .or_else(|| std::env::var("WHATSAPP_BUSINESS_ACCOUNT_ID").ok())
    }

    /// True if live delivery is possible (token and sender id present).
    pub fn is_provider_configured(&self) -> bool {
        self.api_token().is_some() && self.phone_number_id().is_some()
    }

    pub fn default_region_or_default(&self) -> String {
        self.default_region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_ascii_uppercase()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn max_concurrent_sends_or_default(&self) -> usize {
        self.max_concurrent_sends
            .unwrap_or(DEFAULT_MAX_CONCURRENT_SENDS)
            .clamp(1, MAX_CONCURRENT_SENDS_LIMIT)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts.unwrap_or(1),
            Duration::from_millis(self.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS)),
        )
    }
}

/// Batch-level retry of transient member failures. Chosen by the caller;
/// the default makes a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per recipient, including the first (>= 1).
    pub max_attempts: u32,
    /// Wait before the first retry round; doubles each round.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before retry round `round` (1-based).
    pub fn delay_before(&self, round: u32) -> Duration {
        let factor = 1u32
            .checked_shl(round.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.default_region_or_default(), "PK");
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.max_concurrent_sends_or_default(), 5);
        assert_eq!(cfg.retry_policy().max_attempts, 1);
    }

    #[test]
    fn test_clamps_and_normalizes() {
        let cfg = AppConfig {
            default_region: Some(" in ".into()),
            timeout_secs: Some(0),
            max_concurrent_sends: Some(50),
            retry_max_attempts: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.default_region_or_default(), "IN");
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.max_concurrent_sends_or_default(), 10);
        assert_eq!(cfg.retry_policy().max_attempts, 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_before(1), Duration::from_millis(100));
        assert_eq!(policy.delay_before(2), Duration::from_millis(200));
        assert_eq!(policy.delay_before(3), Duration::from_millis(400));
        assert!(policy.delay_before(40) >= policy.delay_before(3));
    }
}
