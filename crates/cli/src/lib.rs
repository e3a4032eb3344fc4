//! # FhirPull CLI
//!
//! Thin command-line surface over the FhirPull client stack. Argument
//! parsing and output formatting live here; all retrieval behavior lives
//! in `fhirpull-core` and `fhirpull-infra`.

pub mod args;
pub mod commands;
pub mod context;
pub mod utils;

pub use args::{Cli, Command};
pub use context::AppContext;
