//! Integration tests for the pagination scheduler
//!
//! **Coverage:**
//! - Page budget honoured, no follow-up request once it is used up
//! - Missing `next` link ends the session below the budget
//! - Totals are taken from the first page only
//! - Mid-session failures under both page failure policies
//! - Result ordering across pages

mod support;

use fhirpull_core::{PaginationScheduler, SchedulerOptions, SearchQuery};
use fhirpull_domain::{FhirPullError, PageFailurePolicy, ResourceType, StopReason};
use support::{next_url, patient_page, ScriptedPages};

fn ids(report: &fhirpull_domain::FetchReport) -> Vec<&str> {
    report.resources.iter().filter_map(|r| r.id()).collect()
}

#[tokio::test]
async fn single_page_budget_stops_before_following_next_link() {
    let source = ScriptedPages::new(vec![patient_page(&["p1", "p2"], Some(next_url(2)), Some(2))]);
    let scheduler = PaginationScheduler::new(source.clone());

    let report = scheduler
        .fetch_all(&SearchQuery::new(ResourceType::Patient).page_size(2).max_pages(1))
        .await
        .unwrap();

    assert_eq!(report.resources.len(), 2);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.total, Some(2));
    assert_eq!(report.stop_reason, StopReason::MaxPagesReached);
    assert_eq!(source.request_count(), 1, "no follow-up request may be issued");
}

#[tokio::test]
async fn missing_next_link_stops_below_budget() {
    let source = ScriptedPages::new(vec![
        patient_page(&["p1"], Some(next_url(2)), None),
        patient_page(&["p2"], None, None),
    ]);
    let scheduler = PaginationScheduler::new(source.clone());

    let report =
        scheduler.fetch_all(&SearchQuery::new(ResourceType::Patient).max_pages(5)).await.unwrap();

    assert_eq!(ids(&report), vec!["p1", "p2"]);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.total, None);
    assert_eq!(report.stop_reason, StopReason::Exhausted);
    assert_eq!(source.request_count(), 2);
}

#[tokio::test]
async fn follow_up_requests_never_resend_search_params() {
    let source = ScriptedPages::new(vec![
        patient_page(&["p1"], Some(next_url(2)), Some(3)),
        patient_page(&["p2"], Some(next_url(3)), Some(999)),
        patient_page(&["p3"], None, Some(999)),
    ]);
    let scheduler = PaginationScheduler::new(source.clone());

    let report = scheduler
        .fetch_all(&SearchQuery::new(ResourceType::Patient).filter("name", "smith").max_pages(0))
        .await
        .unwrap();

    let requests = source.requests();
    assert_eq!(requests.len(), 3);
    let first = requests[0].params().unwrap();
    assert!(first.contains(&("name".to_string(), "smith".to_string())));
    assert!(first.contains(&("_count".to_string(), "100".to_string())));
    assert!(first.contains(&("active".to_string(), "true".to_string())));
    assert!(requests[1..].iter().all(|r| r.is_cursor() && r.params().is_none()));

    // Only the first page's total is trusted
    assert_eq!(report.total, Some(3));
    assert_eq!(ids(&report), vec!["p1", "p2", "p3"]);
}

#[tokio::test]
async fn pages_fetched_never_exceeds_budget() {
    for max_pages in 1..=4 {
        let script = (1..=6)
            .map(|n| {
                let id = format!("p{n}");
                patient_page(&[id.as_str()], Some(next_url(n + 1)), None)
            })
            .collect();
        let source = ScriptedPages::new(script);
        let scheduler = PaginationScheduler::new(source.clone());

        let report = scheduler
            .fetch_all(&SearchQuery::new(ResourceType::Patient).page_size(1).max_pages(max_pages))
            .await
            .unwrap();

        assert_eq!(report.pages_fetched, max_pages);
        assert_eq!(source.request_count(), max_pages as usize);
        assert!(report.resources.len() <= (max_pages as usize));
        assert_eq!(report.stop_reason, StopReason::MaxPagesReached);
    }
}

#[tokio::test]
async fn empty_page_with_next_link_still_counts_and_continues() {
    let source = ScriptedPages::new(vec![
        patient_page(&[], Some(next_url(2)), None),
        patient_page(&["p2"], None, None),
    ]);
    let report = PaginationScheduler::new(source)
        .fetch_all(&SearchQuery::new(ResourceType::Patient).max_pages(0))
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(ids(&report), vec!["p2"]);
}

#[tokio::test]
async fn accept_partial_keeps_earlier_pages_and_reports_failure() {
    let source = ScriptedPages::new(vec![
        patient_page(&["p1", "p2"], Some(next_url(2)), Some(10)),
        Err(FhirPullError::Transient { status: Some(503), attempts: 5, message: "busy".into() }),
    ]);
    let report = PaginationScheduler::new(source)
        .fetch_all(&SearchQuery::new(ResourceType::Patient).max_pages(0))
        .await
        .unwrap();

    assert_eq!(ids(&report), vec!["p1", "p2"]);
    assert_eq!(report.pages_fetched, 1);
    assert!(!report.is_complete());
    assert_eq!(report.failure().and_then(FhirPullError::status), Some(503));
}

#[tokio::test]
async fn fail_policy_surfaces_mid_session_error() {
    let source = ScriptedPages::new(vec![
        patient_page(&["p1"], Some(next_url(2)), None),
        Err(FhirPullError::Network("connection reset".into())),
    ]);
    let scheduler = PaginationScheduler::new(source).with_options(SchedulerOptions {
        on_page_failure: PageFailurePolicy::Fail,
        ..SchedulerOptions::default()
    });

    let result = scheduler.fetch_all(&SearchQuery::new(ResourceType::Patient).max_pages(0)).await;
    assert!(matches!(result, Err(FhirPullError::Network(_))));
}

#[tokio::test]
async fn first_page_failure_yields_empty_partial_report() {
    let source = ScriptedPages::new(vec![Err(FhirPullError::Http {
        status: 400,
        message: "bad search parameter".into(),
    })]);
    let report = PaginationScheduler::new(source)
        .fetch_all(&SearchQuery::new(ResourceType::Patient))
        .await
        .unwrap();

    assert!(report.resources.is_empty());
    assert_eq!(report.pages_fetched, 0);
    assert!(matches!(report.stop_reason, StopReason::Failed(FhirPullError::Http { status: 400, .. })));
}

#[tokio::test]
async fn fetch_resources_returns_partial_list() {
    let source = ScriptedPages::new(vec![
        patient_page(&["p1"], Some(next_url(2)), None),
        Err(FhirPullError::Network("timeout".into())),
    ]);
    let resources = PaginationScheduler::new(source)
        .fetch_resources(&SearchQuery::new(ResourceType::Patient).max_pages(3))
        .await
        .unwrap();

    assert_eq!(resources.len(), 1);
}

#[tokio::test]
async fn server_cap_flag_only_at_or_above_cap() {
    for (total, flagged) in [(4_999, false), (5_000, true), (12_000, true)] {
        let source = ScriptedPages::new(vec![patient_page(&["p1"], None, Some(total))]);
        let report = PaginationScheduler::new(source)
            .fetch_all(&SearchQuery::new(ResourceType::Patient))
            .await
            .unwrap();
        assert_eq!(report.server_cap_reached, flagged, "total {total}");
    }
}
