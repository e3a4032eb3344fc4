//! Search pages and the outcome of a pagination session

use serde::{Deserialize, Serialize};

use super::resource::{Resource, ResourceType};
use crate::errors::FhirPullError;

/// Query parameters as ordered key/value pairs
pub type QueryParams = Vec<(String, String)>;

/// Which page to fetch.
///
/// The first page of a session is addressed by resource type plus the full
/// search parameters. Every later page is addressed only by the opaque
/// continuation URL the server handed back; search parameters are never
/// re-sent for those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    Search { params: QueryParams },
    Cursor { url: String },
}

/// A request for one page of search results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Entries of any other declared type are dropped from the page
    pub resource_type: ResourceType,
    pub target: PageTarget,
}

impl PageRequest {
    pub fn search(resource_type: ResourceType, params: QueryParams) -> Self {
        Self { resource_type, target: PageTarget::Search { params } }
    }

    pub fn cursor(resource_type: ResourceType, url: impl Into<String>) -> Self {
        Self { resource_type, target: PageTarget::Cursor { url: url.into() } }
    }

    /// Search parameters, present only for a first-page request
    pub fn params(&self) -> Option<&QueryParams> {
        match &self.target {
            PageTarget::Search { params } => Some(params),
            PageTarget::Cursor { .. } => None,
        }
    }

    pub fn is_cursor(&self) -> bool {
        matches!(self.target, PageTarget::Cursor { .. })
    }
}

/// One parsed page of search results. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Matching entries in document order
    pub entries: Vec<Resource>,
    /// Continuation URL of the following page; `None` on the last page
    pub next: Option<String>,
    /// Server-reported match count. Only set when the originating search
    /// parameters were sent with the request.
    pub total: Option<u64>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Why a pagination session stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "error", rename_all = "snake_case")]
pub enum StopReason {
    /// The last page carried no `next` link
    Exhausted,
    /// The page budget was used up while more pages were available
    MaxPagesReached,
    /// A page fetch failed; accumulated resources cover only earlier pages
    Failed(FhirPullError),
}

/// Result of one pagination session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchReport {
    pub resource_type: ResourceType,
    /// Resources in page-arrival order, document order within a page
    pub resources: Vec<Resource>,
    pub pages_fetched: u32,
    /// Total reported on the first page, if any
    pub total: Option<u64>,
    /// The reported total met the server's hard result cap, so results
    /// are truncated server-side
    pub server_cap_reached: bool,
    pub stop_reason: StopReason,
}

impl FetchReport {
    /// No page failed during the session
    pub fn is_complete(&self) -> bool {
        !matches!(self.stop_reason, StopReason::Failed(_))
    }

    pub fn failure(&self) -> Option<&FhirPullError> {
        match &self.stop_reason {
            StopReason::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_resources(self) -> Vec<Resource> {
        self.resources
    }
}
