//! Application context - dependency injection container
//!
//! Everything the commands need is built once from a validated [`Config`]
//! and handed around explicitly. There are no process-wide singletons: two
//! contexts built from two configs share nothing.

use std::path::PathBuf;
use std::sync::Arc;

use fhirpull_core::{
    AccessTokenProvider, PageSource, PaginationScheduler, PayorLookupService, ResourceReader,
    SchedulerOptions, SearchQuery,
};
use fhirpull_domain::{Config, ResourceType, Result};
use fhirpull_infra::{AgencyTokenClient, FhirClient, HttpClient, TokenManager};
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub http: HttpClient,
    pub tokens: Arc<TokenManager<AgencyTokenClient>>,
    pub fhir: Arc<FhirClient>,
    pub scheduler: PaginationScheduler,
    pub payors: PayorLookupService,
}

impl AppContext {
    /// Wire the client stack for `config`.
    ///
    /// # Errors
    ///
    /// [`fhirpull_domain::FhirPullError::Config`] when the configuration is
    /// invalid or the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::from_config(&config.api, &config.retry)?;

        let exchange = AgencyTokenClient::new(http.clone(), config.auth.clone());
        let tokens = Arc::new(TokenManager::new(exchange, config.token_refresh.clone()));

        let provider: Arc<dyn AccessTokenProvider> = tokens.clone();
        let fhir = Arc::new(FhirClient::new(http.clone(), provider, &config.api.base_url)?);

        let pages: Arc<dyn PageSource> = fhir.clone();
        let reader: Arc<dyn ResourceReader> = fhir.clone();
        let scheduler = PaginationScheduler::new(Arc::clone(&pages))
            .with_options(SchedulerOptions::from(&config.pagination));
        let payors = PayorLookupService::new(pages, reader);

        info!(
            base_url = %fhir.base_url(),
            max_concurrent_requests = config.api.max_concurrent_requests,
            max_attempts = config.retry.max_attempts,
            "application context ready"
        );

        Ok(Self { config, http, tokens, fhir, scheduler, payors })
    }

    /// Search for `resource_type` seeded with the configured pagination
    /// defaults
    pub fn query(&self, resource_type: ResourceType) -> SearchQuery {
        SearchQuery::with_defaults(resource_type, &self.config.pagination)
    }

    /// Directory JSON exports are written to
    pub fn export_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.export.output_dir)
    }
}
