//! Patient → Account → guarantor → Organization lookup results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource::Resource;

/// Summary of a payor organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayorDetails {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Value>,
}

impl PayorDetails {
    /// Summarise an Organization resource
    pub fn from_organization(organization: &Resource) -> Self {
        let body = organization.as_json();
        let type_code = body
            .pointer("/type/0/coding/0/code")
            .and_then(Value::as_str)
            .map(str::to_string);
        let phone = body
            .get("telecom")
            .and_then(Value::as_array)
            .and_then(|telecom| {
                telecom.iter().find(|t| t.get("system").and_then(Value::as_str) == Some("phone"))
            })
            .and_then(|t| t.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            id: organization.id().map(str::to_string),
            name: body.get("name").and_then(Value::as_str).map(str::to_string),
            type_code,
            phone,
            address: body.pointer("/address/0").cloned(),
        }
    }
}

/// Outcome of a payor lookup for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayorLookup {
    pub patient_id: String,
    pub payor_ids: Vec<String>,
    pub payor_details: Vec<PayorDetails>,
    /// Set when the lookup stopped early; the other fields hold what was
    /// gathered before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PayorLookup {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            payor_ids: Vec::new(),
            payor_details: Vec::new(),
            error: None,
        }
    }

    pub fn has_payors(&self) -> bool {
        !self.payor_ids.is_empty()
    }
}
