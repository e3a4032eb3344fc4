use std::sync::Arc;
use std::time::Duration;

use fhirpull_domain::constants::{
    DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use fhirpull_domain::{ApiConfig, FhirPullError, Result, RetryPolicy};
use reqwest::{Client as ReqwestClient, Method, Request, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::errors::InfraError;

/// Longest slice of an error body carried into error messages
const ERROR_BODY_LIMIT: usize = 512;

/// HTTP client with classified retry, timeout and a process-wide cap on
/// simultaneous requests.
///
/// Only 429/5xx statuses (per [`RetryPolicy::retriable_statuses`]) and read
/// timeouts are retried. Connection failures and every other non-2xx status
/// are returned straight away.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: Arc<RetryPolicy>,
    permits: Arc<Semaphore>,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Client configured from the API section and the shared retry policy
    pub fn from_config(api: &ApiConfig, retry: &RetryPolicy) -> Result<Self> {
        Self::builder()
            .timeout(api.request_timeout())
            .max_concurrent_requests(api.max_concurrent_requests)
            .user_agent(api.user_agent.clone())
            .retry_policy(retry.clone())
            .build()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// Each attempt downloads the whole body before it is classified, so a
    /// timeout while the body is still arriving is retried like a timeout
    /// waiting for the headers. Returns only 2xx responses.
    ///
    /// # Errors
    ///
    /// - [`FhirPullError::Transient`] once a retriable failure survived every
    ///   attempt
    /// - [`FhirPullError::Http`] / [`FhirPullError::NotFound`] for other
    ///   non-2xx statuses, without retry
    /// - [`FhirPullError::Network`] for connection failures, without retry
    pub async fn send(&self, builder: RequestBuilder) -> Result<HttpResponse> {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                FhirPullError::Internal(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request = cloned_builder
                .build()
                .map_err(|err| FhirPullError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt, %method, %url, "sending HTTP request");

            // The permit covers the exchange only, never a backoff sleep
            let outcome = {
                let _permit = self.permits.acquire().await.map_err(|_| {
                    FhirPullError::Internal("HTTP request limiter has been closed".into())
                })?;
                self.execute_buffered(request).await
            };

            let (status, reason) = match outcome {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, %method, %url, %status, "received HTTP response");

                    if status.is_success() {
                        return Ok(response);
                    }

                    if !self.retry.is_retriable_status(status.as_u16()) {
                        return Err(status_error(status, &method, &url, &response.error_body()));
                    }
                    (Some(status.as_u16()), format!("{method} {url} returned {status}"))
                }
                Err(err) if err.is_timeout() && self.retry.retry_on_timeout => {
                    (None, format!("{method} {url} timed out"))
                }
                Err(err) => {
                    debug!(attempt, %method, %url, error = %err, "HTTP request failed");
                    return Err(InfraError::from(err).into());
                }
            };

            if attempt == max_attempts {
                warn!(attempts = attempt, %url, %reason, "giving up after transient failures");
                return Err(FhirPullError::Transient { status, attempts: attempt, message: reason });
            }

            let delay = self.retry.delay_for_attempt(attempt);
            info!(
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                reason = %reason,
                "retrying request after transient failure"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Err(FhirPullError::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    /// One request and its complete body
    async fn execute_buffered(
        &self,
        request: Request,
    ) -> std::result::Result<HttpResponse, reqwest::Error> {
        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body: body.to_vec() })
    }
}

/// A response whose body has been read in full
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// [`FhirPullError::InvalidResponse`] when the body is not valid JSON for
    /// `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| InfraError::from(err).into())
    }

    /// Body text cut to [`ERROR_BODY_LIMIT`] bytes for error messages
    fn error_body(&self) -> String {
        let mut body = String::from_utf8_lossy(&self.body).into_owned();
        if body.len() > ERROR_BODY_LIMIT {
            let mut cut = ERROR_BODY_LIMIT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        body
    }
}

fn status_error(
    status: StatusCode,
    method: &Method,
    url: &reqwest::Url,
    body: &str,
) -> FhirPullError {
    let message = if body.is_empty() {
        format!("{method} {url} returned status {status}")
    } else {
        format!("{method} {url} returned status {status}: {body}")
    };

    match status {
        StatusCode::NOT_FOUND => FhirPullError::NotFound(message),
        _ => FhirPullError::Http { status: status.as_u16(), message },
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
    max_concurrent_requests: usize,
    user_agent: Option<String>,
    default_headers: Option<reqwest::header::HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts.max(1);
        self
    }

    pub fn max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit.max(1);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: reqwest::header::HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(|err| FhirPullError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            retry: Arc::new(self.retry),
            permits: Arc::new(Semaphore::new(self.max_concurrent_requests.max(1))),
        })
    }
}
