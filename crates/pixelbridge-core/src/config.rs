use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::TrackerError,
    validation::{validate_access_token, validate_pixel_id},
};

pub const DEFAULT_ENDPOINT_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// Everything a tracker needs, fixed at construction.
///
/// Loaded from JSON, unknown keys are rejected rather than ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    pub pixel_id: String,
    /// Required for server-side submission.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub debug: bool,
    /// Routes events to the platform's test-events view.
    #[serde(default)]
    pub test_event_code: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Enables `appsecret_proof` request signing.
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default)]
    pub partner_agent: Option<String>,
    #[serde(default = "default_endpoint_base")]
    pub endpoint_base: String,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    /// Upper bound of the uniform jitter added to each backoff delay.
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_jitter_ms: 1000,
        }
    }
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_endpoint_base() -> String {
    DEFAULT_ENDPOINT_BASE.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl TrackerConfig {
    pub fn new(pixel_id: impl Into<String>) -> Self {
        Self {
            pixel_id: pixel_id.into(),
            access_token: None,
            debug: false,
            test_event_code: None,
            api_version: default_api_version(),
            app_secret: None,
            partner_agent: None,
            endpoint_base: default_endpoint_base(),
            retry: RetryConfig::default(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_endpoint_base(mut self, base: impl Into<String>) -> Self {
        self.endpoint_base = base.into();
        self
    }

    pub fn with_test_event_code(mut self, code: impl Into<String>) -> Self {
        self.test_event_code = Some(code.into());
        self
    }

    pub fn with_app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = Some(secret.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Read `PIXELBRIDGE_*` environment variables.
    pub fn from_env() -> Result<Self, TrackerError> {
        let pixel_id = std::env::var("PIXELBRIDGE_PIXEL_ID")
            .map_err(|_| TrackerError::config("PIXELBRIDGE_PIXEL_ID is required"))?;
        let defaults = RetryConfig::default();
        Ok(Self {
            pixel_id,
            access_token: std::env::var("PIXELBRIDGE_ACCESS_TOKEN").ok(),
            debug: std::env::var("PIXELBRIDGE_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            test_event_code: std::env::var("PIXELBRIDGE_TEST_EVENT_CODE").ok(),
            api_version: std::env::var("PIXELBRIDGE_API_VERSION")
                .unwrap_or_else(|_| default_api_version()),
            app_secret: std::env::var("PIXELBRIDGE_APP_SECRET").ok(),
            partner_agent: std::env::var("PIXELBRIDGE_PARTNER_AGENT").ok(),
            endpoint_base: std::env::var("PIXELBRIDGE_ENDPOINT")
                .unwrap_or_else(|_| default_endpoint_base()),
            retry: RetryConfig {
                max_attempts: env_parse("PIXELBRIDGE_RETRY_ATTEMPTS", defaults.max_attempts)?,
                base_delay_ms: env_parse("PIXELBRIDGE_RETRY_BASE_MS", defaults.base_delay_ms)?,
                max_jitter_ms: env_parse("PIXELBRIDGE_RETRY_JITTER_MS", defaults.max_jitter_ms)?,
            },
            timeout_ms: env_parse("PIXELBRIDGE_TIMEOUT_MS", default_timeout_ms())?,
        })
    }

    /// Check the options needed by a tracker. Server-side use additionally
    /// requires a valid access token.
    pub fn validate(&self, server_side: bool) -> Result<(), TrackerError> {
        validate_pixel_id(&self.pixel_id)?;
        if server_side {
            let token = self.access_token.as_deref().ok_or_else(|| {
                TrackerError::config("access_token is required for server-side tracking")
            })?;
            validate_access_token(token)?;
        }
        if self.api_version.trim().is_empty() {
            return Err(TrackerError::config("api_version must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(TrackerError::config("retry.max_attempts must be at least 1"));
        }
        self.endpoint_url()?;
        Ok(())
    }

    /// `{endpoint_base}/{api_version}/{pixel_id}/events`
    pub fn endpoint_url(&self) -> Result<Url, TrackerError> {
        let raw = format!(
            "{}/{}/{}/events",
            self.endpoint_base.trim_end_matches('/'),
            self.api_version,
            self.pixel_id
        );
        let url = Url::parse(&raw)
            .map_err(|e| TrackerError::config(format!("invalid endpoint {raw}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TrackerError::config("endpoint must use http:// or https://"));
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, TrackerError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| TrackerError::config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "123456789012345";

    fn token() -> String {
        "EAAB".to_string() + &"x".repeat(60)
    }

    #[test]
    fn endpoint_url_is_composed() {
        let cfg = TrackerConfig::new(PIXEL).with_endpoint_base("http://127.0.0.1:9000/");
        assert_eq!(
            cfg.endpoint_url().expect("url").as_str(),
            "http://127.0.0.1:9000/v21.0/123456789012345/events"
        );
    }

    #[test]
    fn server_side_requires_token() {
        let cfg = TrackerConfig::new(PIXEL);
        assert!(cfg.validate(false).is_ok());
        assert!(matches!(cfg.validate(true), Err(TrackerError::Config(_))));
        assert!(cfg.clone().with_access_token("short").validate(true).is_err());
        assert!(cfg.with_access_token(token()).validate(true).is_ok());
    }

    #[test]
    fn bad_pixel_id_is_a_config_error() {
        let cfg = TrackerConfig::new("12345").with_access_token(token());
        assert!(matches!(cfg.validate(true), Err(TrackerError::Config(_))));
    }

    #[test]
    fn non_http_endpoint_rejected() {
        let cfg = TrackerConfig::new(PIXEL)
            .with_access_token(token())
            .with_endpoint_base("ftp://example.com");
        assert!(cfg.validate(true).is_err());
    }

    #[test]
    fn json_config_applies_defaults_and_rejects_unknown_keys() {
        let cfg: TrackerConfig =
            serde_json::from_str(r#"{"pixel_id":"123456789012345"}"#).expect("parse");
        assert_eq!(cfg, TrackerConfig::new(PIXEL));

        let bad = serde_json::from_str::<TrackerConfig>(
            r#"{"pixel_id":"123456789012345","pixelId":"1"}"#,
        );
        assert!(bad.is_err());
    }
}
