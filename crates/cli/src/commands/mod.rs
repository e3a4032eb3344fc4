//! End-user flows, one module per command family

pub mod patients;
pub mod payor;

pub use patients::{fetch_patients, get_patient, PatientsOptions, PatientsOutcome};
pub use payor::{lookup_payors, PayorOutcome};
