//! Shared wiring for infra integration tests: a mock identity server and
//! FHIR API on one `wiremock` server, plus the production client stack
//! pointed at it.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use fhirpull_domain::{AuthConfig, RetryPolicy, TokenRefreshPolicy};
use fhirpull_infra::{AgencyTokenClient, FhirClient, HttpClient, TokenManager};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN_PATH: &str = "/connect/token";

static TRACING: Once = Once::new();

/// Route test logs through the libtest capture
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    });
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::with_delays(Duration::from_millis(1), Duration::from_millis(5))
}

/// Mount a token endpoint issuing `tok-1`, `tok-2`, ... and return the
/// issue counter.
pub async fn mount_token_endpoint(server: &MockServer) -> Arc<AtomicUsize> {
    let issued = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&issued);
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(move |_: &Request| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            ResponseTemplate::new(200).set_body_json(json!({"access_token": format!("tok-{n}")}))
        })
        .mount(server)
        .await;
    issued
}

pub struct Stack {
    pub tokens: Arc<TokenManager<AgencyTokenClient>>,
    pub fhir: Arc<FhirClient>,
}

/// The production stack against `server`, with fast retry delays
pub fn stack(server: &MockServer) -> Stack {
    let http = HttpClient::builder().retry_policy(fast_retry()).build().expect("http client");
    let auth = AuthConfig::new(
        format!("{}{TOKEN_PATH}", server.uri()),
        "client",
        "rsid",
        "secret",
    );
    let tokens = Arc::new(TokenManager::new(
        AgencyTokenClient::new(http.clone(), auth),
        TokenRefreshPolicy::default(),
    ));
    let fhir = FhirClient::new(http, tokens.clone(), &fhir_base(server)).expect("fhir client");
    Stack { tokens, fhir: Arc::new(fhir) }
}

pub fn fhir_base(server: &MockServer) -> String {
    format!("{}/fhir", server.uri())
}

/// Continuation URL for page `offset` of a patient search
pub fn next_link(server: &MockServer, offset: u32) -> String {
    format!("{}/Patient?_getpages=session-1&_getpagesoffset={offset}", fhir_base(server))
}

/// Search-set bundle of patients with optional `next` link and total
pub fn patient_bundle(ids: &[&str], next: Option<String>, total: Option<u64>) -> Value {
    let entries: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "fullUrl": format!("Patient/{id}"),
                "resource": {"resourceType": "Patient", "id": id}
            })
        })
        .collect();
    let mut links = vec![json!({"relation": "self", "url": "https://example.org/self"})];
    if let Some(next) = next {
        links.push(json!({"relation": "next", "url": next}));
    }

    let mut bundle = json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "link": links,
        "entry": entries,
    });
    if let Some(total) = total {
        bundle["total"] = json!(total);
    }
    bundle
}
