//! Agency client-credential exchange

use async_trait::async_trait;
use fhirpull_domain::{AuthConfig, FhirPullError, Result};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::token_manager::TokenExchange;
use crate::http::HttpClient;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Posts the agency credentials to the token endpoint.
///
/// Goes through the retrying [`HttpClient`], so 429/5xx answers from the
/// identity server are retried like any other call. Every remaining failure
/// is reported as [`FhirPullError::Auth`].
pub struct AgencyTokenClient {
    http: HttpClient,
    config: AuthConfig,
}

impl AgencyTokenClient {
    pub fn new(http: HttpClient, config: AuthConfig) -> Self {
        Self { http, config }
    }

    fn form(&self) -> [(&'static str, &str); 5] {
        [
            ("grant_type", self.config.grant_type.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("scope", self.config.scope.as_str()),
            ("resource_security_id", self.config.resource_security_id.as_str()),
            ("agency_secret", self.config.agency_secret.as_str()),
        ]
    }
}

#[async_trait]
impl TokenExchange for AgencyTokenClient {
    #[instrument(skip(self), fields(token_url = %self.config.token_url))]
    async fn exchange(&self) -> Result<String> {
        let request = self
            .http
            .request(Method::POST, self.config.token_url.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&self.form());

        let response = self
            .http
            .send(request)
            .await
            .map_err(|err| FhirPullError::Auth(format!("token request failed: {err}")))?;

        let body = response
            .json::<TokenResponse>()
            .map_err(|err| FhirPullError::Auth(format!("unreadable token response: {err}")))?;

        debug!(expires_in = ?body.expires_in, "token endpoint answered");

        body.access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| FhirPullError::Auth("token response carried no access_token".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fhirpull_domain::RetryPolicy;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::testing::StallingServer;

    fn client(server: &MockServer) -> AgencyTokenClient {
        let http = HttpClient::builder()
            .retry_policy(RetryPolicy::with_delays(Duration::from_millis(1), Duration::from_millis(5)))
            .build()
            .unwrap();
        let config = AuthConfig::new(
            format!("{}/connect/token", server.uri()),
            "client-1",
            "rsid-9",
            "s3cret",
        );
        AgencyTokenClient::new(http, config)
    }

    #[tokio::test]
    async fn posts_agency_form_and_reads_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/connect/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=agency_auth"))
            .and(body_string_contains("client_id=client-1"))
            .and(body_string_contains("resource_security_id=rsid-9"))
            .and(body_string_contains("agency_secret=s3cret"))
            .and(body_string_contains("scope=openid+HCHB.api.scope"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "abc", "expires_in": 3600})),
            )
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(client(&server).exchange().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn missing_access_token_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
            .mount(&server)
            .await;

        let err = client(&server).exchange().await.unwrap_err();
        assert!(matches!(err, FhirPullError::Auth(msg) if msg.contains("access_token")));
    }

    #[tokio::test]
    async fn rejected_credentials_are_auth_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_client"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).exchange().await.unwrap_err();
        assert!(matches!(err, FhirPullError::Auth(msg) if msg.contains("invalid_client")));
    }

    #[tokio::test]
    async fn transient_token_endpoint_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "late"})))
            .mount(&server)
            .await;

        assert_eq!(client(&server).exchange().await.unwrap(), "late");
    }

    #[tokio::test]
    async fn token_body_that_stalls_after_headers_is_retried() {
        let server = StallingServer::start(1, r#"{"access_token":"slow-but-fine"}"#).await;
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(300))
            .retry_policy(RetryPolicy::with_delays(Duration::from_millis(1), Duration::from_millis(5)))
            .build()
            .unwrap();
        let config = AuthConfig::new(format!("{}/connect/token", server.url()), "c", "r", "s");

        let token = AgencyTokenClient::new(http, config).exchange().await.unwrap();

        assert_eq!(token, "slow-but-fine");
        assert_eq!(server.hits(), 2);
    }
}
