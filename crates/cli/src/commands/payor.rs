//! Payor lookup for one patient

use std::path::PathBuf;

use chrono::Local;
use fhirpull_domain::{PayorLookup, Result};
use fhirpull_infra::{export_json, timestamped_file_name};
use tracing::{info, instrument, warn};

use crate::context::AppContext;

#[derive(Debug)]
pub struct PayorOutcome {
    /// `None` when no patient id was given and no sample patient exists
    pub lookup: Option<PayorLookup>,
    pub exported: Option<PathBuf>,
}

/// Resolve the payors of `patient_id`, or of the first active patient when
/// no id is given. A lookup that found payors is always exported.
///
/// # Errors
///
/// Failure to find a sample patient, and export I/O errors. Lookup failures
/// themselves are carried in [`PayorLookup::error`].
#[instrument(skip(context))]
pub async fn lookup_payors(context: &AppContext, patient_id: Option<&str>) -> Result<PayorOutcome> {
    let patient_id = match patient_id {
        Some(id) => id.to_string(),
        None => match context.payors.sample_patient_id().await? {
            Some(id) => {
                info!(patient_id = %id, "using sample patient");
                id
            }
            None => {
                warn!("no active patient available for payor lookup");
                return Ok(PayorOutcome { lookup: None, exported: None });
            }
        },
    };

    let lookup = context.payors.lookup(&patient_id).await;

    let exported = if lookup.has_payors() {
        let stem = format!("patient_payor_{patient_id}");
        let file_name = timestamped_file_name(&stem, Local::now());
        Some(export_json(&context.export_dir(), &file_name, &lookup)?)
    } else {
        None
    };

    Ok(PayorOutcome { lookup: Some(lookup), exported })
}
