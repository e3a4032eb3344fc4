//! Port interfaces for the fetch engine
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use fhirpull_domain::{Page, PageRequest, Resource, ResourceType, Result};

/// Trait for providing bearer credentials
///
/// Implementations own the token lifecycle and must serialize refresh
/// decisions across concurrent callers.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get a token, refreshing first when `force_refresh` is set or the
    /// refresh policy says the held token is due.
    async fn token(&self, force_refresh: bool) -> Result<String>;

    /// Get a valid access token
    async fn access_token(&self) -> Result<String> {
        self.token(false).await
    }
}

/// Trait for fetching one page of search results
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch and parse a single page.
    ///
    /// Failures are returned, never coerced into an empty page.
    async fn fetch_page(&self, request: PageRequest) -> Result<Page>;
}

/// Trait for reading a single resource by identifier
#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// `Ok(None)` when the server answers 404; every other failure is an
    /// error.
    async fn read(&self, resource_type: &ResourceType, id: &str) -> Result<Option<Resource>>;
}
