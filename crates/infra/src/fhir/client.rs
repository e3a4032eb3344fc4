//! Authenticated FHIR client
//!
//! Implements the [`PageSource`] and [`ResourceReader`] ports on top of the
//! retrying [`HttpClient`]. Every request asks the token provider for a
//! credential, so use-count based refresh sees each call.

use std::sync::Arc;

use async_trait::async_trait;
use fhirpull_core::{AccessTokenProvider, PageSource, ResourceReader};
use fhirpull_domain::constants::FHIR_JSON_MEDIA_TYPE;
use fhirpull_domain::{
    FhirPullError, Page, PageRequest, PageTarget, QueryParams, Resource, ResourceType, Result,
};
use reqwest::header::ACCEPT;
use reqwest::Method;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::bundle::Bundle;
use crate::http::{HttpClient, HttpResponse};

pub struct FhirClient {
    http: HttpClient,
    tokens: Arc<dyn AccessTokenProvider>,
    base_url: Url,
}

impl FhirClient {
    /// # Errors
    ///
    /// [`FhirPullError::Config`] when `base_url` is not a usable base URL.
    pub fn new(
        http: HttpClient,
        tokens: Arc<dyn AccessTokenProvider>,
        base_url: &str,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            FhirPullError::Config(format!("invalid FHIR base URL {base_url}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FhirPullError::Config(format!("{base_url} cannot be used as a base URL")));
        }
        Ok(Self { http, tokens, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FhirPullError::Config(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: &Url, params: Option<&QueryParams>, token: &str) -> Result<HttpResponse> {
        let mut request = self
            .http
            .request(Method::GET, url.clone())
            .bearer_auth(token)
            .header(ACCEPT, FHIR_JSON_MEDIA_TYPE);
        if let Some(params) = params {
            request = request.query(params);
        }
        self.http.send(request).await
    }

    /// GET with one reactive credential refresh on 401.
    ///
    /// A second 401 is returned as an ordinary error.
    async fn get_with_reauth(&self, url: &Url, params: Option<&QueryParams>) -> Result<HttpResponse> {
        let token = self.tokens.access_token().await?;
        match self.get(url, params, &token).await {
            Err(err) if err.is_unauthorized() => {
                info!(%url, "access token rejected, refreshing and retrying once");
                let token = self.tokens.token(true).await?;
                self.get(url, params, &token).await
            }
            other => other,
        }
    }

    async fn load_page(
        &self,
        url: &Url,
        params: Option<&QueryParams>,
        resource_type: &ResourceType,
    ) -> Result<Page> {
        let response = self.get_with_reauth(url, params).await?;
        let bundle = response.json::<Bundle>()?;
        Ok(bundle.into_page(resource_type, params.is_some()))
    }
}

#[async_trait]
impl PageSource for FhirClient {
    #[instrument(
        skip(self, request),
        fields(resource_type = %request.resource_type, cursor = request.is_cursor())
    )]
    async fn fetch_page(&self, request: PageRequest) -> Result<Page> {
        let (url, params) = match &request.target {
            PageTarget::Search { params } => {
                (self.endpoint(&[request.resource_type.as_str()])?, Some(params))
            }
            PageTarget::Cursor { url } => {
                let url = Url::parse(url).map_err(|e| {
                    FhirPullError::InvalidResponse(format!("malformed next link {url}: {e}"))
                })?;
                (url, None)
            }
        };

        match self.load_page(&url, params, &request.resource_type).await {
            Ok(page) => {
                debug!(
                    %url,
                    entries = page.entries.len(),
                    has_next = page.next.is_some(),
                    total = ?page.total,
                    "fetched page"
                );
                Ok(page)
            }
            Err(err) => {
                error!(%url, error = %err, category = ?err.category(), "error fetching page");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl ResourceReader for FhirClient {
    #[instrument(skip(self))]
    async fn read(&self, resource_type: &ResourceType, id: &str) -> Result<Option<Resource>> {
        let url = self.endpoint(&[resource_type.as_str(), id])?;
        let token = self.tokens.access_token().await?;

        let response = match self.get(&url, None, &token).await {
            Ok(response) => response,
            Err(err) if err.is_not_found() => {
                warn!(%url, "resource not found");
                return Ok(None);
            }
            Err(err) => {
                error!(%url, error = %err, "error reading resource");
                return Err(err);
            }
        };

        let resource = response.json::<Resource>().inspect_err(|err| {
            error!(%url, error = %err, "unreadable resource body");
        })?;
        Ok(Some(resource))
    }
}
