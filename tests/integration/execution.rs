//! Request execution: retries, redirects, concurrency guard, blocking mode.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sdata::client::{ErrorKind, Phase};
use sdata::{SDataRequest, Value};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{fast_config, init_tracing};

// ============================================================================
// Timeout retry
// ============================================================================

#[tokio::test]
async fn test_timeout_budget_gives_n_plus_one_attempts() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let request =
        SDataRequest::new(format!("{}/accounts", server.uri())).with_config(fast_config(100, 2));
    let err = request.execute().await.unwrap_err();

    assert!(
        matches!(err.kind, ErrorKind::TimeoutRetriesExhausted { attempts: 3 }),
        "unexpected error: {err:?}"
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_zero_budget_gives_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = SDataRequest::new(server.uri())
        .with_config(fast_config(100, 0))
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::TimeoutRetriesExhausted { attempts: 1 }));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_connection_failure_is_not_retried() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });

    let err = SDataRequest::new(format!("http://{address}/accounts"))
        .with_config(fast_config(5_000, 3))
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::Transport(_)), "unexpected error: {err:?}");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Redirects
// ============================================================================

#[tokio::test]
async fn test_redirect_chain_reports_last_location() {
    init_tracing();
    let server = MockServer::start().await;
    for (from, to, status) in [
        ("/start", "/hop1", 307),
        ("/hop1", "/hop2", 302),
        ("/hop2", "/hop3", 307),
    ] {
        Mock::given(method("GET"))
            .and(path(from))
            .respond_with(ResponseTemplate::new(status).insert_header("Location", to))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/hop3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"Name":"Acme"}"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = SDataRequest::new(format!("{}/start", server.uri()))
        .execute()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let expected = format!("{}/hop3", server.uri());
    assert_eq!(response.location(), Some(expected.as_str()));
    assert_eq!(
        response.value().and_then(|v| v.get("Name")).and_then(Value::as_str),
        Some("Acme")
    );
}

#[tokio::test]
async fn test_location_header_wins_over_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", "/created/7"))
        .mount(&server)
        .await;

    let response = SDataRequest::new(format!("{}/old", server.uri()))
        .execute()
        .await
        .unwrap();
    assert_eq!(response.location(), Some("/created/7"));
}

// ============================================================================
// Concurrency guard
// ============================================================================

#[tokio::test]
async fn test_second_execution_fails_without_disturbing_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"Name":"Acme"}"#, "application/json")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let request = Arc::new(SDataRequest::new(server.uri()));
    let first = {
        let request = Arc::clone(&request);
        tokio::spawn(async move { request.execute().await })
    };
    while request.phase() != Phase::Running {
        tokio::task::yield_now().await;
    }

    let err = request.execute().await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InProgress));
    assert!(err.is_usage_error());

    let response = first.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(request.phase(), Phase::Idle);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    // Reusable once idle again.
    assert!(request.execute().await.is_ok());
}

// ============================================================================
// Blocking execution and tracking
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_execution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("hello", "text/plain"))
        .mount(&server)
        .await;

    let request = SDataRequest::new(format!("{}/accounts", server.uri()));
    let worker = std::thread::spawn(move || request.execute_blocking());
    let response = tokio::task::spawn_blocking(move || worker.join())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(response.text(), Some("hello"));
}

#[tokio::test]
async fn test_tracking_envelope_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(202).set_body_raw(
            r#"<sdata:tracking xmlns:sdata="http://schemas.sage.com/sdata/2008/1">
                 <sdata:phase>Importing</sdata:phase>
                 <sdata:phaseDetail>row 10 of 40</sdata:phaseDetail>
                 <sdata:progress>25</sdata:progress>
                 <sdata:elapsedSeconds>3</sdata:elapsedSeconds>
                 <sdata:remainingSeconds>9</sdata:remainingSeconds>
                 <sdata:pollingMillis>500</sdata:pollingMillis>
               </sdata:tracking>"#,
            "application/xml",
        ))
        .mount(&server)
        .await;

    let response = SDataRequest::new(server.uri()).execute().await.unwrap();
    let tracking = response.tracking().expect("tracking content");
    assert_eq!(tracking.phase, "Importing");
    assert_eq!(tracking.polling_millis, 500);
    assert_eq!(tracking.remaining_seconds, 9);
}
