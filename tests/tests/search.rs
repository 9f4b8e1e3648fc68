mod utils;
use utils::*;

use anyhow::Context;
use mock_service::{Behavior, RecordedRequest};
use pka_probe::prelude::*;
use pka_probe::{ProbeError, SearchProbe};
use pka_probe_core::STATUS_CHECK;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn woody() -> RecordedRequest {
    RecordedRequest {
        content_type: Some("application/json".to_string()),
        query: "woody".to_string(),
    }
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn passes_on_200() {
    let (settings, mock) = mock(Behavior::Ok).await;

    let stats = pka_probe::search_pka_event(&settings)
        .unwrap()
        .await
        .unwrap();

    let check = stats.check(STATUS_CHECK).unwrap();
    assert_eq!((check.passes, check.fails), (1, 0));
    assert_eq!(stats.iterations, 1);
    assert_eq!(stats.iteration_errors, 0);
    assert_eq!(stats.requests, 1);
    assert!(stats.clean());
    // The single iteration includes the one second pause.
    assert!(stats.elapsed >= Duration::from_secs(1));

    assert_eq!(mock.requests(), vec![woody()]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn fails_on_500() {
    let (settings, mock) = mock(Behavior::Status(500)).await;

    let stats = pka_probe::search_pka_event(&settings)
        .unwrap()
        .await
        .unwrap();

    let check = stats.check(STATUS_CHECK).unwrap();
    assert_eq!((check.passes, check.fails), (0, 1));
    // A wrong status is a failed check, not an errored iteration.
    assert_eq!(stats.iteration_errors, 0);
    assert!(!stats.checks_passed());
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn fails_on_404() {
    let (settings, _mock) = mock(Behavior::Status(404)).await;

    let stats = pka_probe::search_pka_event(&settings)
        .unwrap()
        .await
        .unwrap();

    let check = stats.check(STATUS_CHECK).unwrap();
    assert_eq!((check.passes, check.fails), (0, 1));
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn connection_refused_surfaces_and_fails() {
    let settings = refused();

    let stats = pka_probe::search_pka_event(&settings)
        .unwrap()
        .await
        .unwrap();

    let check = stats.check(STATUS_CHECK).unwrap();
    assert_eq!((check.passes, check.fails), (0, 1));
    assert_eq!(stats.iterations, 1);
    assert_eq!(stats.iteration_errors, 1);
    assert_eq!(stats.requests, 0);
    assert!(!stats.clean());
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn iteration_returns_transport_error() {
    let probe = SearchProbe::new(&refused()).unwrap();

    let res = probe.iteration().await;
    assert!(matches!(res, Err(ProbeError::Transport(_))));
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn iteration_pauses_one_second() {
    let (settings, _mock) = mock(Behavior::Ok).await;
    let probe = SearchProbe::new(&settings).unwrap();

    let start = Instant::now();
    probe.iteration().await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3));
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn sends_the_configured_query() {
    let (mut settings, mock) = mock(Behavior::Ok).await;
    settings.query = "ryan".to_string();
    let probe = SearchProbe::new(&settings).unwrap();

    assert_eq!(probe.send().await.unwrap().as_u16(), 200);
    assert_eq!(
        mock.requests(),
        vec![RecordedRequest {
            content_type: Some("application/json".to_string()),
            query: "ryan".to_string(),
        }]
    );
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn shared_iterations_across_vus() {
    let (mut settings, mock) = mock(Behavior::Ok).await;
    settings.think_time = Duration::from_millis(100);

    let stats = pka_probe::search_pka_event(&settings)
        .unwrap()
        .vus(3)
        .iterations(6)
        .await
        .unwrap();

    assert_eq!(stats.vus, 3);
    assert_eq!(stats.iterations, 6);
    assert_eq!(stats.requests, 6);
    assert_eq!(stats.check(STATUS_CHECK).unwrap().passes, 6);
    assert_eq!(mock.requests(), vec![woody(); 6]);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn duration_bounds_the_run() {
    let (settings, mock) = mock(Behavior::Ok).await;

    let stats = pka_probe::search_pka_event(&settings)
        .unwrap()
        .vus(2)
        .duration(Duration::from_millis(1500))
        .await
        .unwrap();

    // Each VU starts at most two iterations: at zero and after its first pause.
    assert!(stats.iterations >= 2 && stats.iterations <= 4);
    assert_eq!(stats.interrupted, 0);
    assert_eq!(mock.requests().len() as u64, stats.iterations);
    assert!(stats.elapsed >= Duration::from_millis(1500));
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn overloaded_service_fails_checks() {
    let (mut settings, _mock) = mock(Behavior::Limited(1)).await;
    settings.think_time = Duration::from_millis(10);

    let stats = pka_probe::search_pka_event(&settings)
        .unwrap()
        .vus(4)
        .iterations(4)
        .await
        .unwrap();

    let check = stats.check(STATUS_CHECK).unwrap();
    assert_eq!(check.total(), 4);
    assert!(check.passes >= 1);
    assert!(check.fails >= 1);
    assert_eq!(stats.iteration_errors, 0);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn summary_exports_as_json() {
    let (mut settings, _mock) = mock(Behavior::Ok).await;
    settings.think_time = Duration::from_millis(10);

    let stats = pka_probe::search_pka_event(&settings)
        .unwrap()
        .iterations(2)
        .await
        .unwrap();

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["name"], "search_pka_event");
    assert_eq!(json["iterations"], 2);
    assert_eq!(json["checks"][0]["name"], "status was 200");
    assert_eq!(json["checks"][0]["passes"], 2);
    assert!(json["request_latency"]["p50"].as_f64().unwrap() >= 0.);
}

#[tokio::test]
#[ntest::timeout(10000)]
async fn custom_iteration_with_anyhow_errors() {
    let (mut settings, mock) = mock(Behavior::Status(503)).await;
    settings.think_time = Duration::from_millis(10);
    let probe = Arc::new(SearchProbe::new(&settings).unwrap());

    let stats = Scenario::new("custom", move || {
        let probe = probe.clone();
        async move {
            let status = probe.send().await.context("search request")?;
            if !check(STATUS_CHECK, status.as_u16() == 200) {
                return Err(anyhow::anyhow!("search answered {status}"));
            }
            Ok::<(), anyhow::Error>(())
        }
    })
    .vus(2)
    .iterations(4)
    .await
    .unwrap();

    assert_eq!(stats.iterations, 4);
    assert_eq!(stats.iteration_errors, 4);
    assert_eq!(stats.requests, 4);
    assert_eq!(stats.check(STATUS_CHECK).unwrap().fails, 4);
    assert_eq!(mock.requests().len(), 4);
}
