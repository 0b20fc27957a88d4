//! Integration tests: scheduler + curl transport against a local HTTP server.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fetchy_core::retry::RetryPolicy;
use fetchy_core::transport::CurlOptions;
use fetchy_core::{CurlTransport, FetchError, FetchScheduler, Query, RequestDescriptor};

fn transport() -> Arc<CurlTransport> {
    let policy = RetryPolicy {
        max_attempts: 1,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
    };
    Arc::new(CurlTransport::new(CurlOptions::default(), policy))
}

fn scheduler(concurrency: usize, requests: Vec<RequestDescriptor>) -> FetchScheduler {
    FetchScheduler::new(transport(), concurrency, requests.into()).unwrap()
}

#[tokio::test]
async fn fetches_all_declared_requests() {
    let base = common::http_server::start();
    let requests = (1..=4)
        .map(|i| RequestDescriptor::get(format!("r{}", i), format!("{}/echo?n={}", base, i)))
        .collect();
    let mut s = scheduler(2, requests);

    let report = s.mount();
    assert_eq!(report.started, vec!["r1", "r2"]);

    let states = s.run_until_idle().await;
    assert!(states.all_settled());
    for (i, (id, state)) in states.iter().enumerate() {
        assert!(state.fulfilled, "{} should be fulfilled: {:?}", id, state.error);
        let value = state.value.as_ref().unwrap();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["query"], format!("n={}", i + 1));
        assert_eq!(state.result.as_ref().unwrap().status, 200);
    }
}

#[tokio::test]
async fn forwards_query_and_headers() {
    let base = common::http_server::start();
    let mut pairs = BTreeMap::new();
    pairs.insert("page".to_string(), "2".to_string());
    let request = RequestDescriptor::get("q", format!("{}/echo?lang=en", base))
        .with_query(Query::Pairs(pairs))
        .with_header("X-Token", "secret");
    let mut s = scheduler(1, vec![request]);
    s.mount();

    let states = s.run_until_idle().await;
    let value = states.get("q").unwrap().value.clone().unwrap();
    assert_eq!(value["query"], "lang=en&page=2");
    assert_eq!(value["headers"]["x-token"], "secret");
}

#[tokio::test]
async fn posts_json_and_form_bodies() {
    let base = common::http_server::start();
    let requests = vec![
        RequestDescriptor::get("json", format!("{}/echo", base))
            .with_method("post")
            .with_body(serde_json::json!({"name": "ada"})),
        RequestDescriptor::get("form", format!("{}/echo", base))
            .with_method("PUT")
            .with_body(serde_json::json!("a=1&b=2")),
    ];
    let mut s = scheduler(2, requests);
    s.mount();

    let states = s.run_until_idle().await;
    let json = states.get("json").unwrap().value.clone().unwrap();
    assert_eq!(json["method"], "POST");
    assert_eq!(json["body"], r#"{"name":"ada"}"#);
    assert_eq!(json["headers"]["content-type"], "application/json");

    let form = states.get("form").unwrap().value.clone().unwrap();
    assert_eq!(form["method"], "PUT");
    assert_eq!(form["body"], "a=1&b=2");
    assert_eq!(
        form["headers"]["content-type"],
        "application/x-www-form-urlencoded"
    );
}

#[tokio::test]
async fn text_body_becomes_string_value() {
    let base = common::http_server::start();
    let mut s = scheduler(1, vec![RequestDescriptor::get("t", format!("{}/text", base))]);
    s.mount();
    let states = s.run_until_idle().await;
    assert_eq!(
        states.get("t").unwrap().value,
        Some(serde_json::json!("hello from fetchy"))
    );
}

#[tokio::test]
async fn server_error_rejects_with_status_and_response() {
    let base = common::http_server::start();
    let requests = vec![
        RequestDescriptor::get("bad", format!("{}/status/500", base)),
        RequestDescriptor::get("missing", format!("{}/status/404", base)),
        RequestDescriptor::get("good", format!("{}/status/200", base)),
    ];
    let mut s = scheduler(1, requests);
    s.mount();

    let states = s.run_until_idle().await;
    let bad = states.get("bad").unwrap();
    assert!(bad.rejected);
    let err = bad.error.as_ref().unwrap();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
    assert_eq!(bad.result.as_ref().unwrap().status, 500);

    assert_eq!(
        states.get("missing").unwrap().error.as_ref().unwrap().status(),
        Some(404)
    );
    assert!(states.get("good").unwrap().fulfilled);
}

#[tokio::test]
async fn transport_retries_retryable_statuses() {
    let base = common::http_server::start();
    let requests = vec![
        RequestDescriptor::get("flaky", format!("{}/flaky/2", base)).with_retry(2),
        RequestDescriptor::get("no-retry", format!("{}/flaky/1", base)),
    ];
    let mut s = scheduler(2, requests);
    s.mount();

    let states = s.run_until_idle().await;
    let flaky = states.get("flaky").unwrap();
    assert!(flaky.fulfilled, "{:?}", flaky.error);
    assert_eq!(flaky.value.as_ref().unwrap()["attempts"], 3);
    assert_eq!(
        states.get("no-retry").unwrap().error.as_ref().unwrap().status(),
        Some(503)
    );
}

#[tokio::test]
async fn fast_fail_descriptors_do_not_block_the_rest() {
    let base = common::http_server::start();
    let requests = vec![
        RequestDescriptor {
            url: None,
            ..RequestDescriptor::get("nourl", "")
        },
        RequestDescriptor::get("ok", format!("{}/echo", base)),
    ];
    let mut s = scheduler(1, requests);
    let report = s.mount();
    assert_eq!(report.started, vec!["ok"]);
    assert_eq!(
        report.failed,
        vec![FetchError::MissingUrl {
            id: "nourl".to_string()
        }]
    );

    let states = s.run_until_idle().await;
    assert!(states.get("nourl").unwrap().rejected);
    assert!(states.get("ok").unwrap().fulfilled);
}

#[tokio::test]
async fn connection_failure_rejects_without_status() {
    // Port 9 (discard) is not listening on test hosts.
    let mut s = scheduler(
        1,
        vec![RequestDescriptor::get("down", "http://127.0.0.1:9/echo")],
    );
    s.mount();
    let states = s.run_until_idle().await;
    let down = states.get("down").unwrap();
    assert!(down.rejected);
    assert_eq!(down.error.as_ref().unwrap().status(), None);
    assert!(down.result.is_none());
}

#[tokio::test]
async fn per_request_timeout_rejects() {
    let base = common::http_server::start();
    let request = RequestDescriptor::get("slow", format!("{}/echo?delay=1500", base))
        .with_timeout(Duration::from_millis(200));
    let mut s = scheduler(1, vec![request]);
    s.mount();
    let states = s.run_until_idle().await;
    let slow = states.get("slow").unwrap();
    assert!(slow.rejected);
    assert!(!slow.error.as_ref().unwrap().is_abort());
}

#[tokio::test]
async fn removing_in_flight_request_starts_the_next() {
    let base = common::http_server::start();
    let slow = RequestDescriptor::get("slow", format!("{}/echo?delay=1500", base));
    let fast = RequestDescriptor::get("fast", format!("{}/echo", base));
    let mut s = scheduler(1, vec![slow, fast.clone()]);
    assert_eq!(s.mount().started, vec!["slow"]);

    let report = s.set_requests(vec![fast].into()).unwrap();
    assert_eq!(report.started, vec!["fast"]);

    let states = s.run_until_idle().await;
    assert_eq!(states.len(), 1);
    assert!(states.get("fast").unwrap().fulfilled);
    assert!(!states.contains("slow"));
}

#[tokio::test]
async fn abort_and_retry_over_http() {
    let base = common::http_server::start();
    let mut s = scheduler(
        1,
        vec![RequestDescriptor::get("r", format!("{}/echo?delay=300", base))],
    );
    s.mount();
    s.abort("r");
    assert_eq!(
        s.state("r").unwrap().error,
        Some(FetchError::Aborted)
    );
    assert!(s.step().await.is_none());

    let report = s.retry("r").unwrap();
    assert_eq!(report.started, vec!["r"]);
    let states = s.run_until_idle().await;
    assert!(states.get("r").unwrap().fulfilled);
}

#[tokio::test]
async fn unmount_aborts_in_flight_requests() {
    let base = common::http_server::start();
    let requests = vec![
        RequestDescriptor::get("a", format!("{}/echo?delay=1000", base)),
        RequestDescriptor::get("b", format!("{}/echo?delay=1000", base)),
        RequestDescriptor::get("c", format!("{}/echo", base)),
    ];
    let mut s = scheduler(2, requests);
    s.mount();
    let mut rx = s.subscribe();

    s.unmount();
    let states = s.states();
    for (_, state) in states.iter() {
        assert_eq!(state.error, Some(FetchError::Aborted));
    }
    assert_eq!(*rx.borrow_and_update(), states);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(s.step().await.is_none());
    assert_eq!(s.states(), states);
}
