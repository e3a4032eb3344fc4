//! Search query construction with default augmentation

use fhirpull_domain::constants::{ACTIVE_PARAM, DEFAULT_ACTIVE, PAGE_SIZE_PARAM};
use fhirpull_domain::{PaginationConfig, QueryParams, ResourceType};

/// A paginated search over one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub resource_type: ResourceType,
    /// Caller-supplied filters, sent as given
    pub filters: QueryParams,
    pub page_size: u32,
    /// Maximum pages for the session, 0 means unlimited
    pub max_pages: u32,
    /// When false, `active=true` is added unless the caller filtered on
    /// `active` already
    pub include_inactive: bool,
}

impl SearchQuery {
    /// Query using the library defaults (100 per page, one page, active only)
    pub fn new(resource_type: ResourceType) -> Self {
        Self::with_defaults(resource_type, &PaginationConfig::default())
    }

    pub fn with_defaults(resource_type: ResourceType, defaults: &PaginationConfig) -> Self {
        Self {
            resource_type,
            filters: Vec::new(),
            page_size: defaults.page_size,
            max_pages: defaults.max_pages,
            include_inactive: defaults.include_inactive,
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    pub fn filters<I, K, V>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.filters.extend(filters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn include_inactive(mut self, include_inactive: bool) -> Self {
        self.include_inactive = include_inactive;
        self
    }

    /// The page budget has been used up
    pub fn budget_exhausted(&self, pages_fetched: u32) -> bool {
        self.max_pages > 0 && pages_fetched >= self.max_pages
    }

    /// Full parameter set for the first page of the session.
    ///
    /// The page size always replaces any caller-supplied `_count`.
    pub fn first_page_params(&self) -> QueryParams {
        let mut params: QueryParams =
            self.filters.iter().filter(|(key, _)| key != PAGE_SIZE_PARAM).cloned().collect();

        params.push((PAGE_SIZE_PARAM.to_string(), self.page_size.to_string()));

        if !self.include_inactive && !self.filters.iter().any(|(key, _)| key == ACTIVE_PARAM) {
            params.push((ACTIVE_PARAM.to_string(), DEFAULT_ACTIVE.to_string()));
        }

        params
    }
}
