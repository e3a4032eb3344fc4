//! Token manager with use-count and age based refresh
//!
//! All state sits behind one async mutex: the refresh decision, the
//! credential exchange and the counter update happen under the same lock,
//! so concurrent callers neither double-refresh nor lose increments.

use async_trait::async_trait;
use fhirpull_core::AccessTokenProvider;
use fhirpull_domain::{FhirPullError, Result, TokenRefreshPolicy};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Obtains a fresh bearer token from the identity server
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// # Errors
    ///
    /// [`FhirPullError::Auth`] when no usable token could be obtained.
    async fn exchange(&self) -> Result<String>;
}

/// Why the held token is being replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Forced,
    NoToken,
    UseLimitReached,
    MaxAgeExceeded,
}

impl RefreshReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forced => "forced",
            Self::NoToken => "no_token",
            Self::UseLimitReached => "use_limit_reached",
            Self::MaxAgeExceeded => "max_age_exceeded",
        }
    }
}

#[derive(Default)]
struct TokenState {
    token: Option<String>,
    issued_at: Option<Instant>,
    use_count: u32,
}

impl TokenState {
    fn refresh_reason(
        &self,
        force_refresh: bool,
        policy: &TokenRefreshPolicy,
        now: Instant,
    ) -> Option<RefreshReason> {
        if force_refresh {
            return Some(RefreshReason::Forced);
        }
        let Some(issued_at) = self.issued_at.filter(|_| self.token.is_some()) else {
            return Some(RefreshReason::NoToken);
        };
        if self.use_count >= policy.max_uses {
            return Some(RefreshReason::UseLimitReached);
        }
        if now.duration_since(issued_at) > policy.max_age() {
            return Some(RefreshReason::MaxAgeExceeded);
        }
        None
    }
}

/// Token manager shared by every component that calls the API
pub struct TokenManager<E: TokenExchange> {
    exchange: E,
    policy: TokenRefreshPolicy,
    state: Mutex<TokenState>,
}

impl<E: TokenExchange> TokenManager<E> {
    pub fn new(exchange: E, policy: TokenRefreshPolicy) -> Self {
        Self { exchange, policy, state: Mutex::new(TokenState::default()) }
    }

    /// Get the current token, replacing it first when forced or due.
    ///
    /// Every successful call counts as one use of the returned token.
    ///
    /// # Errors
    ///
    /// Propagates the exchange failure; the previously held token and its
    /// counters are left untouched in that case.
    #[instrument(skip(self))]
    pub async fn get_token(&self, force_refresh: bool) -> Result<String> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if let Some(reason) = state.refresh_reason(force_refresh, &self.policy, now) {
            info!(reason = reason.as_str(), uses = state.use_count, "refreshing access token");
            let token = self.exchange.exchange().await.inspect_err(|err| {
                warn!(reason = reason.as_str(), error = %err, "access token refresh failed");
            })?;
            *state = TokenState { token: Some(token), issued_at: Some(now), use_count: 0 };
        }

        state.use_count += 1;
        debug!(uses = state.use_count, "access token handed out");
        state
            .token
            .clone()
            .ok_or_else(|| FhirPullError::Auth("no access token available".into()))
    }

    /// Uses of the held token since it was issued
    pub async fn use_count(&self) -> u32 {
        self.state.lock().await.use_count
    }
}

#[async_trait]
impl<E: TokenExchange> AccessTokenProvider for TokenManager<E> {
    async fn token(&self, force_refresh: bool) -> Result<String> {
        self.get_token(force_refresh).await
    }
}
