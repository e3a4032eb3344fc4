//! Application constants
//!
//! Centralized location for the defaults and protocol constants used by the
//! fetch engine.

// HTTP
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;
pub const FHIR_JSON_MEDIA_TYPE: &str = "application/fhir+json";
pub const DEFAULT_USER_AGENT: &str = concat!("fhirpull/", env!("CARGO_PKG_VERSION"));

// Retry policy
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 4_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_RETRIABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

// Token lifecycle (refresh ahead of the ~1 hour server-side expiry)
pub const TOKEN_REFRESH_INTERVAL: u32 = 100;
pub const TOKEN_MAX_AGE_SECS: u64 = 3_000;
pub const AGENCY_GRANT_TYPE: &str = "agency_auth";
pub const DEFAULT_TOKEN_SCOPE: &str = "openid HCHB.api.scope agency.identity hchb.identity";

// Search & pagination
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u32 = 1;
pub const DEFAULT_ACTIVE: &str = "true";
pub const SERVER_RESULT_CAP: u64 = 5_000;
pub const PAGE_SIZE_PARAM: &str = "_count";
pub const ACTIVE_PARAM: &str = "active";
pub const NEXT_LINK_RELATION: &str = "next";

// Payor lookup
pub const ACCOUNT_PAGE_SIZE: u32 = 100;
pub const ORGANIZATION_REFERENCE_PREFIX: &str = "Organization/";

// Export
pub const DEFAULT_EXPORT_DIR: &str = "samples";
