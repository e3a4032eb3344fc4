//! Payor lookup use case

pub mod service;

pub use service::{guarantor_organization_ids, PayorLookupService};
