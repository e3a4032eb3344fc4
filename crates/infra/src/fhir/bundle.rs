//! Search result envelope

use fhirpull_domain::constants::NEXT_LINK_RELATION;
use fhirpull_domain::{Page, Resource, ResourceType};
use serde::Deserialize;
use serde_json::Value;

/// The parts of a FHIR `Bundle` that pagination needs
#[derive(Debug, Default, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
    #[serde(default)]
    pub link: Vec<BundleLink>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BundleEntry {
    #[serde(default)]
    pub resource: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BundleLink {
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Bundle {
    /// URL of the first link with relation `next`
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|link| link.relation.as_deref() == Some(NEXT_LINK_RELATION))
            .and_then(|link| link.url.as_deref())
    }

    /// Build a page keeping only entries of `resource_type`.
    ///
    /// `total` is kept only when `trust_total` is set, i.e. the request
    /// carried the original search parameters.
    pub fn into_page(self, resource_type: &ResourceType, trust_total: bool) -> Page {
        let next = self.next_link().map(str::to_string);
        let total = if trust_total { self.total } else { None };
        let entries = self
            .entry
            .into_iter()
            .filter_map(|entry| entry.resource)
            .map(Resource::new)
            .filter(|resource| resource.is_kind(resource_type))
            .collect();

        Page { entries, next, total }
    }
}
