//! # FhirPull Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The retrying HTTP client
//! - Token management and the agency credential exchange
//! - The FHIR REST client (search pages and read-by-id)
//! - Configuration loading and JSON export
//!
//! ## Architecture
//! - Implements traits defined in `fhirpull-core`
//! - Depends on `fhirpull-domain` and `fhirpull-core`
//! - Contains all "impure" code (HTTP, file system, environment)

pub mod auth;
pub mod config;
pub mod errors;
pub mod export;
pub mod fhir;
pub mod http;

// Re-export commonly used items
pub use auth::{AgencyTokenClient, TokenExchange, TokenManager};
pub use errors::InfraError;
pub use export::{export_json, timestamped_file_name};
pub use fhir::FhirClient;
pub use http::{HttpClient, HttpClientBuilder, HttpResponse};
