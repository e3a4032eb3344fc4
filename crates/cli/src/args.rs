//! Command-line arguments
//!
//! ```bash
//! # First page of active patients
//! fhirpull patients
//!
//! # Every page, including inactive patients, written to disk
//! fhirpull patients --max-pages 0 --include-inactive --export
//!
//! # Search filters are passed through to the API
//! fhirpull patients --filter family=Smith --filter birthdate=ge1950-01-01
//!
//! # One patient by id
//! fhirpull patient 12345
//!
//! # Payors of a patient (or of the first active patient)
//! fhirpull payor --patient-id 12345
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::PatientsOptions;

#[derive(Debug, Parser)]
#[command(
    name = "fhirpull",
    version,
    about = "Paginated FHIR resource retrieval",
    long_about = "Pulls patients and payor organizations from an agency-authenticated FHIR API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file used when the environment is incomplete
    #[arg(long, global = true, env = "FHIRPULL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch patients page by page
    Patients {
        /// Entries per page (`_count`)
        #[arg(long)]
        page_size: Option<u32>,

        /// Page budget, 0 fetches every page
        #[arg(long)]
        max_pages: Option<u32>,

        /// Do not add `active=true` to the search
        #[arg(long)]
        include_inactive: bool,

        /// Extra search parameter, repeatable
        #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Write the fetched patients to the export directory
        #[arg(long)]
        export: bool,
    },

    /// Read one patient by id
    Patient {
        /// Patient logical id
        id: String,
    },

    /// Resolve the payor organizations of a patient
    Payor {
        /// Patient to look up; defaults to the first active patient
        #[arg(long)]
        patient_id: Option<String>,
    },
}

impl Command {
    /// Stable name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Patients { .. } => "patients",
            Self::Patient { .. } => "patient",
            Self::Payor { .. } => "payor",
        }
    }

    /// Options of a `patients` invocation
    pub fn patients_options(&self) -> Option<PatientsOptions> {
        match self {
            Self::Patients { page_size, max_pages, include_inactive, filters, export } => {
                Some(PatientsOptions {
                    page_size: *page_size,
                    max_pages: *max_pages,
                    include_inactive: *include_inactive,
                    filters: filters.clone(),
                    export: *export,
                })
            }
            _ => None,
        }
    }
}

/// Parse `key=value`; the value may itself contain `=`
pub fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_patients_flags() {
        let cli = Cli::parse_from([
            "fhirpull",
            "patients",
            "--page-size",
            "50",
            "--max-pages",
            "0",
            "--filter",
            "family=Smith",
            "--filter",
            "_lastUpdated=ge2024-01-01",
            "--export",
        ]);

        let options = cli.command.patients_options().unwrap();
        assert_eq!(options.page_size, Some(50));
        assert_eq!(options.max_pages, Some(0));
        assert!(!options.include_inactive);
        assert!(options.export);
        assert_eq!(
            options.filters,
            vec![
                ("family".to_string(), "Smith".to_string()),
                ("_lastUpdated".to_string(), "ge2024-01-01".to_string()),
            ]
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["fhirpull", "payor", "--json-logs", "--config", "app.toml"]);
        assert!(cli.json_logs);
        assert_eq!(cli.config, Some(PathBuf::from("app.toml")));
        assert!(matches!(cli.command, Command::Payor { patient_id: None }));
    }

    #[test]
    fn patient_requires_id() {
        assert!(Cli::try_parse_from(["fhirpull", "patient"]).is_err());
        let cli = Cli::parse_from(["fhirpull", "patient", "abc"]);
        assert_eq!(cli.command.name(), "patient");
    }

    #[test]
    fn filter_values_may_contain_equals() {
        assert_eq!(parse_filter("code=a=b"), Ok(("code".to_string(), "a=b".to_string())));
        assert!(parse_filter("novalue").is_err());
        assert!(parse_filter("=x").is_err());
    }
}
