//! # FhirPull Domain
//!
//! Domain types and models for FhirPull.
//!
//! This crate contains:
//! - FHIR resource, page and fetch-report types
//! - Domain error types and Result definitions
//! - Configuration structures (retry, token refresh, pagination)
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other FhirPull crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
