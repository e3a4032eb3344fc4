//! # FhirPull Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for tokens, pages and single reads
//! - The pagination scheduler and search query builder
//! - The payor lookup use case
//!
//! ## Architecture Principles
//! - Only depends on `fhirpull-domain`
//! - No HTTP or file system code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod pagination;
pub mod payor;
pub mod ports;

// Re-export specific items to avoid ambiguity
pub use pagination::{PaginationScheduler, SchedulerOptions, SearchQuery};
pub use payor::PayorLookupService;
pub use ports::{AccessTokenProvider, PageSource, ResourceReader};
