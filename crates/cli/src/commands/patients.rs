//! Patient listing and single-patient retrieval

use std::path::PathBuf;

use chrono::Local;
use fhirpull_core::ResourceReader;
use fhirpull_domain::{FetchReport, QueryParams, Resource, ResourceType, Result};
use fhirpull_infra::{export_json, timestamped_file_name};
use tracing::{info, instrument, warn};

use crate::context::AppContext;

/// Overrides for one `patients` run. Unset fields fall back to the
/// configured pagination defaults.
#[derive(Debug, Clone, Default)]
pub struct PatientsOptions {
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    pub include_inactive: bool,
    pub filters: QueryParams,
    pub export: bool,
}

#[derive(Debug)]
pub struct PatientsOutcome {
    pub report: FetchReport,
    /// Where the patients were written, when export ran
    pub exported: Option<PathBuf>,
}

/// Fetch patients page by page and optionally export them.
///
/// Export runs when requested on the command line or enabled in config,
/// and only when at least one patient was retrieved.
///
/// # Errors
///
/// Page failures under the `fail` policy, and export I/O errors.
#[instrument(skip(context, options))]
pub async fn fetch_patients(
    context: &AppContext,
    options: &PatientsOptions,
) -> Result<PatientsOutcome> {
    let mut query = context
        .query(ResourceType::Patient)
        .filters(options.filters.iter().cloned())
        .include_inactive(options.include_inactive || context.config.pagination.include_inactive);
    if let Some(page_size) = options.page_size {
        query = query.page_size(page_size);
    }
    if let Some(max_pages) = options.max_pages {
        query = query.max_pages(max_pages);
    }

    let report = context.scheduler.fetch_all(&query).await?;
    if let Some(err) = report.failure() {
        warn!(error = %err, retrieved = report.resources.len(), "patient fetch ended early");
    }

    let export = options.export || context.config.export.enabled;
    let exported = if export && !report.resources.is_empty() {
        let file_name = timestamped_file_name("patients", Local::now());
        Some(export_json(&context.export_dir(), &file_name, &report.resources)?)
    } else {
        None
    };

    info!(
        retrieved = report.resources.len(),
        pages_fetched = report.pages_fetched,
        exported = exported.is_some(),
        "patients command finished"
    );
    Ok(PatientsOutcome { report, exported })
}

/// Read one patient by id; `None` when the server has no such patient.
///
/// # Errors
///
/// Any read failure other than not-found.
#[instrument(skip(context))]
pub async fn get_patient(context: &AppContext, patient_id: &str) -> Result<Option<Resource>> {
    context.fhir.read(&ResourceType::Patient, patient_id).await
}
