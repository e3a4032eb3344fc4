//! FhirPull - paginated FHIR retrieval from the command line

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use fhirpull_cli::commands::{fetch_patients, get_patient, lookup_payors};
use fhirpull_cli::utils::logging::{init_logging, log_command_execution};
use fhirpull_cli::{AppContext, Cli, Command};
use fhirpull_domain::{Config, Result};
use fhirpull_infra::config;

/// An explicit `--config` wins over the environment
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            config::load_dotenv();
            let config = config::load_from_file(Some(path))?;
            config.validate()?;
            Ok(config)
        }
        None => config::load(),
    }
}

#[allow(clippy::print_stdout)]
async fn run(context: &AppContext, command: &Command) -> Result<()> {
    match command {
        Command::Patients { .. } => {
            let options = command.patients_options().unwrap_or_default();
            let outcome = fetch_patients(context, &options).await?;
            let report = &outcome.report;

            println!(
                "Retrieved {} patients over {} page(s)",
                report.resources.len(),
                report.pages_fetched
            );
            if let Some(total) = report.total {
                println!("API reported total: {total}");
            }
            if report.server_cap_reached {
                println!("Reported total meets the server result cap; results are truncated");
            }
            if let Some(err) = report.failure() {
                println!("Stopped early: {err}");
            }
            if let Some(path) = &outcome.exported {
                println!("Exported to {}", path.display());
            }
        }
        Command::Patient { id } => match get_patient(context, id).await? {
            Some(patient) => println!("{}", to_pretty(patient.as_json())),
            None => println!("Patient {id} not found"),
        },
        Command::Payor { patient_id } => {
            let outcome = lookup_payors(context, patient_id.as_deref()).await?;
            match &outcome.lookup {
                Some(lookup) => println!("{}", to_pretty(lookup)),
                None => println!("No active patient available for payor lookup"),
            }
            if let Some(path) = &outcome.exported {
                println!("Exported to {}", path.display());
            }
        }
    }
    Ok(())
}

fn to_pretty<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {e}>"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging FIRST so configuration loading is visible
    init_logging(cli.json_logs);

    let config = load_config(cli.config.clone()).context("failed to load configuration")?;
    let context = AppContext::new(config).context("failed to initialize application context")?;

    let started = Instant::now();
    let result = run(&context, &cli.command).await;
    log_command_execution(cli.command.name(), started.elapsed(), result.as_ref().err());

    result.with_context(|| format!("{} command failed", cli.command.name()))
}
