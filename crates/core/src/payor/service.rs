//! Payor lookup service
//!
//! Patient → Account (by subject) → guarantor → Organization. A sequential
//! two-hop join over the same fetch primitives as pagination.

use std::collections::BTreeSet;
use std::sync::Arc;

use fhirpull_domain::constants::{
    ACCOUNT_PAGE_SIZE, ACTIVE_PARAM, DEFAULT_ACTIVE, ORGANIZATION_REFERENCE_PREFIX, PAGE_SIZE_PARAM,
};
use fhirpull_domain::{PageRequest, PayorDetails, PayorLookup, Resource, ResourceType, Result};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::ports::{PageSource, ResourceReader};

/// Resolves the payor organizations of a patient
pub struct PayorLookupService {
    pages: Arc<dyn PageSource>,
    reader: Arc<dyn ResourceReader>,
}

impl PayorLookupService {
    pub fn new(pages: Arc<dyn PageSource>, reader: Arc<dyn ResourceReader>) -> Self {
        Self { pages, reader }
    }

    /// Id of the first active patient the API returns, used when the caller
    /// has no patient in mind
    ///
    /// # Errors
    ///
    /// Returns the page fetch error.
    #[instrument(skip(self))]
    pub async fn sample_patient_id(&self) -> Result<Option<String>> {
        let request = PageRequest::search(
            ResourceType::Patient,
            vec![
                (PAGE_SIZE_PARAM.to_string(), "1".to_string()),
                (ACTIVE_PARAM.to_string(), DEFAULT_ACTIVE.to_string()),
            ],
        );
        let page = self.pages.fetch_page(request).await?;
        Ok(page.entries.iter().find_map(|patient| patient.id().map(str::to_string)))
    }

    /// Look up the payor organizations guaranteeing the patient's accounts.
    ///
    /// Never fails: an error stops the lookup and is recorded in
    /// [`PayorLookup::error`] next to whatever was gathered before it.
    #[instrument(skip(self))]
    pub async fn lookup(&self, patient_id: &str) -> PayorLookup {
        let mut lookup = PayorLookup::new(patient_id);
        if let Err(err) = self.resolve(patient_id, &mut lookup).await {
            warn!(patient_id, error = %err, "payor lookup failed");
            lookup.error = Some(err.to_string());
        }
        lookup
    }

    async fn resolve(&self, patient_id: &str, lookup: &mut PayorLookup) -> Result<()> {
        let request = PageRequest::search(
            ResourceType::Account,
            vec![
                ("subject".to_string(), ResourceType::Patient.reference(patient_id)),
                (PAGE_SIZE_PARAM.to_string(), ACCOUNT_PAGE_SIZE.to_string()),
            ],
        );
        let accounts = self.pages.fetch_page(request).await?;

        lookup.payor_ids = guarantor_organization_ids(&accounts.entries).into_iter().collect();
        info!(patient_id, payors = lookup.payor_ids.len(), "resolved guarantor organizations");

        for payor_id in &lookup.payor_ids {
            match self.reader.read(&ResourceType::Organization, payor_id).await? {
                Some(organization) => {
                    lookup.payor_details.push(PayorDetails::from_organization(&organization));
                }
                None => warn!(payor_id, "payor organization not found"),
            }
        }
        Ok(())
    }
}

/// Distinct organization ids referenced by `guarantor[].party.reference`
pub fn guarantor_organization_ids(accounts: &[Resource]) -> BTreeSet<String> {
    accounts
        .iter()
        .filter_map(|account| account.get("guarantor").and_then(Value::as_array))
        .flatten()
        .filter_map(|guarantor| guarantor.pointer("/party/reference").and_then(Value::as_str))
        .filter_map(|reference| reference.strip_prefix(ORGANIZATION_REFERENCE_PREFIX))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
