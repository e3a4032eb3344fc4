//! Configuration management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AGENCY_GRANT_TYPE, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY_MS, DEFAULT_EXPORT_DIR,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_DELAY_MS,
    DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRIABLE_STATUSES, DEFAULT_TOKEN_SCOPE, DEFAULT_USER_AGENT, SERVER_RESULT_CAP,
    TOKEN_MAX_AGE_SECS, TOKEN_REFRESH_INTERVAL,
};
use crate::errors::{FhirPullError, Result};
use crate::impl_domain_status_conversions;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub token_refresh: TokenRefreshPolicy,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Reject configurations that can never produce an authenticated request
    pub fn validate(&self) -> Result<()> {
        require_url("api.base_url", &self.api.base_url)?;
        require_url("auth.token_url", &self.auth.token_url)?;
        require_non_empty("auth.client_id", &self.auth.client_id)?;
        require_non_empty("auth.resource_security_id", &self.auth.resource_security_id)?;
        require_non_empty("auth.agency_secret", &self.auth.agency_secret)?;

        if self.retry.max_attempts == 0 {
            return Err(FhirPullError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.api.max_concurrent_requests == 0 {
            return Err(FhirPullError::Config(
                "api.max_concurrent_requests must be at least 1".into(),
            ));
        }
        if self.pagination.page_size == 0 {
            return Err(FhirPullError::Config("pagination.page_size must be at least 1".into()));
        }
        Ok(())
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FhirPullError::Config(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_url(field: &str, value: &str) -> Result<()> {
    require_non_empty(field, value)?;
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| FhirPullError::Config(format!("{field} is not a valid URL: {e}")))
}

/// FHIR API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the FHIR API, without the resource type segment
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Process-wide cap on simultaneous outbound HTTP calls
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Agency client-credential exchange settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub resource_security_id: String,
    #[serde(skip_serializing, default)]
    pub agency_secret: String,
    #[serde(default = "default_grant_type")]
    pub grant_type: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl AuthConfig {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        resource_security_id: impl Into<String>,
        agency_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            resource_security_id: resource_security_id.into(),
            agency_secret: agency_secret.into(),
            grant_type: default_grant_type(),
            scope: default_scope(),
        }
    }
}

fn default_grant_type() -> String {
    AGENCY_GRANT_TYPE.to_string()
}

fn default_scope() -> String {
    DEFAULT_TOKEN_SCOPE.to_string()
}

/// Retry policy shared read-only by every outbound request.
///
/// The wait before retry `k` (1-indexed) is `multiplier * 2^(k-1)` seconds,
/// floored at `base_delay_ms` and capped at `max_delay_ms`. With the defaults
/// the four waits of a five-attempt run are 4s, 4s, 4s and 8s.
///
/// This is not `min(max_delay, base_delay * multiplier^(k-1))`.
/// `base_delay_ms` is a floor, not the first wait, and the growth factor is
/// always 2 with `multiplier` scaling it. The schedule stays at the floor
/// until the doubling term passes it, then grows to the cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub retriable_statuses: Vec<u16>,
    /// Treat request timeouts as retriable
    pub retry_on_timeout: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retriable_statuses: DEFAULT_RETRIABLE_STATUSES.to_vec(),
            retry_on_timeout: true,
        }
    }
}

impl RetryPolicy {
    /// Policy with the default classification but custom delays, mostly
    /// useful to keep tests fast.
    pub fn with_delays(base: Duration, max: Duration) -> Self {
        Self {
            base_delay_ms: duration_ms(base),
            max_delay_ms: duration_ms(max),
            ..Self::default()
        }
    }

    pub fn is_retriable_status(&self, status: u16) -> bool {
        self.retriable_statuses.contains(&status)
    }

    /// Wait before the retry that follows failed attempt `attempt` (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX).min(62);
        let raw_ms = self.multiplier.max(0.0) * 2f64.powi(exponent) * 1_000.0;
        let capped = raw_ms.min(self.max_delay_ms as f64);
        let floored = capped.max(self.base_delay_ms.min(self.max_delay_ms) as f64);
        Duration::from_millis(floored as u64)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// When a held token must be replaced before use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRefreshPolicy {
    /// Calls served by one token before it is refreshed
    pub max_uses: u32,
    /// Age after which a token is refreshed
    pub max_age_secs: u64,
}

impl Default for TokenRefreshPolicy {
    fn default() -> Self {
        Self { max_uses: TOKEN_REFRESH_INTERVAL, max_age_secs: TOKEN_MAX_AGE_SECS }
    }
}

impl TokenRefreshPolicy {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// What the pagination scheduler does when a page fetch fails mid-session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFailurePolicy {
    /// Keep what was accumulated and report the failure alongside it
    #[default]
    AcceptPartial,
    /// Abandon the session and return the error
    Fail,
}

impl_domain_status_conversions!(PageFailurePolicy {
    AcceptPartial => "accept_partial",
    Fail => "fail",
});

/// Search defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: u32,
    /// Maximum pages per session, 0 means unlimited
    pub max_pages: u32,
    pub include_inactive: bool,
    /// Hard cap on results the server returns for one query
    pub server_result_cap: u64,
    pub on_page_failure: PageFailurePolicy,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            include_inactive: false,
            server_result_cap: SERVER_RESULT_CAP,
            on_page_failure: PageFailurePolicy::default(),
        }
    }
}

/// JSON export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { enabled: false, output_dir: DEFAULT_EXPORT_DIR.to_string() }
    }
}
