//! Pagination scheduler - walks a `next`-linked result set
//!
//! Every follow-up page URL is only known once the previous page has been
//! parsed, so the scheduler runs a single-slot pipeline: at most one fetch
//! is in flight, and it is started before the previous page's entries are
//! absorbed so the two overlap.

use std::sync::Arc;

use fhirpull_domain::constants::SERVER_RESULT_CAP;
use fhirpull_domain::{
    FetchReport, FhirPullError, Page, PageFailurePolicy, PageRequest, PaginationConfig, Resource,
    ResourceType, Result, StopReason,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Instrument};

use super::query::SearchQuery;
use crate::ports::PageSource;

/// Scheduler options that are not per-query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Reported totals at or above this value mean server-side truncation
    pub server_result_cap: u64,
    pub on_page_failure: PageFailurePolicy,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self { server_result_cap: SERVER_RESULT_CAP, on_page_failure: PageFailurePolicy::default() }
    }
}

impl From<&PaginationConfig> for SchedulerOptions {
    fn from(config: &PaginationConfig) -> Self {
        Self {
            server_result_cap: config.server_result_cap,
            on_page_failure: config.on_page_failure,
        }
    }
}

/// Aggregation state for one `fetch_all` call. Never outlives the call.
struct FetchSession {
    resource_type: ResourceType,
    resources: Vec<Resource>,
    pages_fetched: u32,
    total: Option<u64>,
    server_cap_reached: bool,
}

impl FetchSession {
    fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            resources: Vec::new(),
            pages_fetched: 0,
            total: None,
            server_cap_reached: false,
        }
    }

    fn absorb(&mut self, entries: Vec<Resource>) {
        self.resources.extend(entries);
    }

    fn finish(self, stop_reason: StopReason) -> FetchReport {
        FetchReport {
            resource_type: self.resource_type,
            resources: self.resources,
            pages_fetched: self.pages_fetched,
            total: self.total,
            server_cap_reached: self.server_cap_reached,
            stop_reason,
        }
    }
}

/// Drives a [`PageSource`] across the pages of one search
pub struct PaginationScheduler {
    source: Arc<dyn PageSource>,
    options: SchedulerOptions,
}

impl PaginationScheduler {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source, options: SchedulerOptions::default() }
    }

    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    /// Fetch every page the query allows.
    ///
    /// The first page is fetched with the full parameter set; follow-up
    /// pages use only the server's continuation URL. Stops when a page has
    /// no `next` link or the page budget is used up.
    ///
    /// # Errors
    ///
    /// Only with [`PageFailurePolicy::Fail`]: the first page fetch error is
    /// returned. Under [`PageFailurePolicy::AcceptPartial`] failures are
    /// reported through [`StopReason::Failed`].
    #[instrument(skip(self, query), fields(resource_type = %query.resource_type))]
    pub async fn fetch_all(&self, query: &SearchQuery) -> Result<FetchReport> {
        let mut session = FetchSession::new(query.resource_type.clone());
        let params = query.first_page_params();

        info!(?params, "fetching first page");
        let first = PageRequest::search(query.resource_type.clone(), params);
        let mut current = match self.source.fetch_page(first).await {
            Ok(page) => page,
            Err(err) => return self.page_failed(session, err),
        };

        self.record_total(&mut session, current.total);

        loop {
            session.pages_fetched += 1;
            let Page { entries, next, .. } = current;

            let stop = match next {
                None => Err(StopReason::Exhausted),
                Some(_) if query.budget_exhausted(session.pages_fetched) => {
                    info!(max_pages = query.max_pages, "reached max_pages limit");
                    Err(StopReason::MaxPagesReached)
                }
                Some(url) => Ok(self.spawn_fetch(PageRequest::cursor(query.resource_type.clone(), url))),
            };

            let page_len = entries.len();
            session.absorb(entries);
            info!(
                page = session.pages_fetched,
                page_len,
                retrieved = session.resources.len(),
                "absorbed page"
            );

            let in_flight = match stop {
                Ok(handle) => handle,
                Err(reason) => return Ok(self.finish(session, reason)),
            };

            current = match in_flight.await {
                Ok(Ok(page)) => page,
                Ok(Err(err)) => return self.page_failed(session, err),
                Err(join_err) => {
                    let err = FhirPullError::Internal(format!("page fetch task failed: {join_err}"));
                    return self.page_failed(session, err);
                }
            };
        }
    }

    /// Fetch and return only the resources, logging instead of returning a
    /// mid-session failure. Callers cannot tell a failed page from the end
    /// of the result set here; use [`Self::fetch_all`] when that matters.
    pub async fn fetch_resources(&self, query: &SearchQuery) -> Result<Vec<Resource>> {
        let report = self.fetch_all(query).await?;
        if let Some(err) = report.failure() {
            warn!(
                error = %err,
                retrieved = report.resources.len(),
                "returning partial results after page failure"
            );
        }
        Ok(report.into_resources())
    }

    fn spawn_fetch(&self, request: PageRequest) -> JoinHandle<Result<Page>> {
        let source = Arc::clone(&self.source);
        debug!(?request, "scheduling next page");
        let fetch = async move { source.fetch_page(request).await };
        tokio::spawn(fetch.in_current_span())
    }

    fn record_total(&self, session: &mut FetchSession, total: Option<u64>) {
        session.total = total;
        match total {
            Some(total) => {
                info!(total, resource_type = %session.resource_type, "API reported total");
                if total >= self.options.server_result_cap {
                    session.server_cap_reached = true;
                    warn!(
                        total,
                        cap = self.options.server_result_cap,
                        "MANUAL FLAG: reported total meets the server result cap; results are truncated"
                    );
                }
            }
            None => warn!(resource_type = %session.resource_type, "API did not report a total"),
        }
    }

    fn page_failed(&self, session: FetchSession, err: FhirPullError) -> Result<FetchReport> {
        error!(
            error = %err,
            pages_fetched = session.pages_fetched,
            retrieved = session.resources.len(),
            "page fetch failed"
        );
        match self.options.on_page_failure {
            PageFailurePolicy::Fail => Err(err),
            PageFailurePolicy::AcceptPartial => Ok(self.finish(session, StopReason::Failed(err))),
        }
    }

    fn finish(&self, session: FetchSession, reason: StopReason) -> FetchReport {
        info!(
            pages_fetched = session.pages_fetched,
            retrieved = session.resources.len(),
            ?reason,
            "finished fetching"
        );
        session.finish(reason)
    }
}
