//! FHIR REST client: search pages and read-by-id

mod bundle;
mod client;

pub use bundle::Bundle;
pub use client::FhirClient;
