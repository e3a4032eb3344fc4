//! Shared test helpers for `fhirpull-core` integration tests.
//!
//! Lightweight port fakes so the scheduler and payor tests can focus on
//! behaviour instead of HTTP plumbing.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fhirpull_core::{PageSource, ResourceReader};
use fhirpull_domain::{FhirPullError, Page, PageRequest, Resource, ResourceType, Result};
use serde_json::json;

/// Serves scripted page outcomes in order and records every request.
///
/// Once the script runs out, further requests fail so that an unexpected
/// extra fetch shows up in the report.
pub struct ScriptedPages {
    script: Mutex<VecDeque<Result<Page>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedPages {
    pub fn new(script: Vec<Result<Page>>) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(script.into()), requests: Mutex::new(Vec::new()) })
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PageSource for ScriptedPages {
    async fn fetch_page(&self, request: PageRequest) -> Result<Page> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FhirPullError::Internal("unexpected page request".into())))
    }
}

/// Reader backed by an in-memory map; ids listed in `failing` error out.
#[derive(Default)]
pub struct MapReader {
    resources: HashMap<String, Resource>,
    failing: HashMap<String, FhirPullError>,
    reads: Mutex<Vec<String>>,
}

impl MapReader {
    pub fn with(mut self, resource: Resource) -> Self {
        let key = format!(
            "{}/{}",
            resource.resource_type().unwrap_or_default(),
            resource.id().unwrap_or_default()
        );
        self.resources.insert(key, resource);
        self
    }

    pub fn failing(mut self, reference: &str, err: FhirPullError) -> Self {
        self.failing.insert(reference.to_string(), err);
        self
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceReader for MapReader {
    async fn read(&self, resource_type: &ResourceType, id: &str) -> Result<Option<Resource>> {
        let reference = resource_type.reference(id);
        self.reads.lock().unwrap().push(reference.clone());
        if let Some(err) = self.failing.get(&reference) {
            return Err(err.clone());
        }
        Ok(self.resources.get(&reference).cloned())
    }
}

pub fn resource(kind: &str, id: &str) -> Resource {
    Resource::new(json!({"resourceType": kind, "id": id}))
}

pub fn patient_page(ids: &[&str], next: Option<String>, total: Option<u64>) -> Result<Page> {
    Ok(Page {
        entries: ids.iter().map(|id| resource("Patient", id)).collect(),
        next,
        total,
    })
}

pub fn next_url(page: u32) -> String {
    format!("https://fhir.example.org/Patient?_getpages=abc&page={page}")
}
