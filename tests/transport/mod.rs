use std::{net::TcpListener, time::Duration};

use assert_matches::assert_matches;
use mockito::Server;
use reportportal_client::{
    error::HttpError,
    http::{Body, BlockingRetryingSession, RetryingSession},
    ClientConfig,
};
use serde_json::json;
use tokio::time::Instant;

use crate::types::{config_with_retries, init_tracing, PROJECT};

/// An address nothing is listening on.
fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}")
}

fn unreachable_config(max_retry_number: u32) -> ClientConfig {
    init_tracing();
    ClientConfig::builder()
        .endpoint(closed_address())
        .project(PROJECT)
        .max_retry_number(max_retry_number)
        .base_retry_delay(Duration::from_millis(1))
        .connect_timeout(Duration::from_secs(1))
        .build()
}

/// Given a request which succeeds
/// When it is sent
/// Then it should be sent once
#[tokio::test]
async fn success_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/ok")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let session = RetryingSession::from_config(&config_with_retries(&server, 5)).unwrap();

    let response = session.get(&format!("{}/ok", server.url())).await.unwrap();

    assert_eq!(response.status(), 200);
    mock.assert_async().await;
}

/// Given a request which fails with a status which is not retried
/// When it is sent
/// Then the response should be returned after one attempt
#[tokio::test]
async fn client_error_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/missing")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let session = RetryingSession::from_config(&config_with_retries(&server, 5)).unwrap();

    let response = session
        .post(&format!("{}/missing", server.url()), &Body::Json(json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    mock.assert_async().await;
}

/// Given a server which is unavailable
/// When a request is sent
/// Then it should be retried until the retries run out, and the last response returned
#[tokio::test]
async fn server_error_is_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/busy")
        .with_status(503)
        .expect(4)
        .create_async()
        .await;
    let session = RetryingSession::from_config(&config_with_retries(&server, 3)).unwrap();

    let response = session
        .put(&format!("{}/busy", server.url()), &Body::Json(json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    mock.assert_async().await;
}

/// Given a server which is unavailable
/// When a request is sent with the default retry policy
/// Then the delays between attempts should grow exponentially: 0, 5, 25, 125 and 625 ms
#[tokio::test]
async fn server_error_backs_off() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/busy")
        .with_status(500)
        .expect(6)
        .create_async()
        .await;
    let config = ClientConfig::builder()
        .endpoint(server.url())
        .project(PROJECT)
        .build();
    let session = RetryingSession::from_config(&config).unwrap();

    let now = Instant::now();
    let response = session.get(&format!("{}/busy", server.url())).await.unwrap();

    assert_eq!(response.status(), 500);
    assert_elapsed!(now, Duration::from_millis(780), Duration::from_secs(2));
    mock.assert_async().await;
}

/// Given a server which is throttling
/// When a request is sent
/// Then the throttling delays should be used: 0 then 9 ms for a 3 ms base
#[tokio::test]
async fn throttling_backs_off_more() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/throttled")
        .with_status(429)
        .expect(3)
        .create_async()
        .await;
    let config = ClientConfig::builder()
        .endpoint(server.url())
        .project(PROJECT)
        .max_retry_number(2)
        .base_retry_delay(Duration::from_millis(3))
        .build();
    let session = RetryingSession::from_config(&config).unwrap();

    let now = Instant::now();
    let response = session
        .get(&format!("{}/throttled", server.url()))
        .await
        .unwrap();

    assert_eq!(response.status(), 429);
    assert_elapsed!(now, Duration::from_millis(9), Duration::from_secs(1));
    mock.assert_async().await;
}

/// Given a server which is unavailable at first
/// When a request is sent
/// Then the first successful response should be returned
#[tokio::test]
async fn recovers_after_server_error() {
    let mut server = Server::new_async().await;
    let failure = server
        .mock("GET", "/flaky")
        .with_status(502)
        .expect(1)
        .create_async()
        .await;
    let success = server
        .mock("GET", "/flaky")
        .with_body(r#"{"id": "ok"}"#)
        .expect(1)
        .create_async()
        .await;
    let session = RetryingSession::from_config(&config_with_retries(&server, 3)).unwrap();

    let response = session.get(&format!("{}/flaky", server.url())).await.unwrap();

    assert_eq!(response.status(), 200);
    failure.assert_async().await;
    success.assert_async().await;
}

/// Given a server nobody is listening on
/// When a request is sent
/// Then every connection error should be returned once retries run out
#[tokio::test]
async fn connection_errors_are_aggregated() {
    let config = unreachable_config(2);
    let session = RetryingSession::from_config(&config).unwrap();

    let error = session
        .get(&format!("{}/launch", config.endpoint()))
        .await
        .unwrap_err();

    assert_matches!(&error, HttpError::RetriesExhausted { errors } if errors.len() == 3);
    assert!(error.errors().iter().all(reqwest::Error::is_connect));
    assert!(error.to_string().starts_with("During retry attempts 3 errors happened"));
}

/// Given a server nobody is listening on and no retries
/// When a request is sent
/// Then the single connection error should be returned as it is
#[tokio::test]
async fn single_connection_error_is_not_wrapped() {
    let config = unreachable_config(0);
    let session = RetryingSession::from_config(&config).unwrap();

    let error = session
        .get(&format!("{}/launch", config.endpoint()))
        .await
        .unwrap_err();

    assert_matches!(error, HttpError::Request(error) if error.is_connect());
}

/// Given a request which can't be built
/// When it is sent
/// Then the error should be returned without retrying
#[tokio::test]
async fn invalid_request_is_not_retried() {
    let session = RetryingSession::from_config(&unreachable_config(5)).unwrap();

    let now = Instant::now();
    let error = session.get("not a url").await.unwrap_err();

    assert_matches!(error, HttpError::Request(_));
    assert_elapsed!(now, Duration::ZERO, Duration::from_millis(500));
}

/// Given an API key which is not a valid header value
/// When a session is created
/// Then it should fail
#[test]
fn invalid_api_key() {
    let config = ClientConfig::builder()
        .endpoint("http://localhost")
        .project(PROJECT)
        .api_key("bad\nkey".to_owned())
        .build();

    assert_matches!(
        RetryingSession::from_config(&config),
        Err(HttpError::InvalidApiKey)
    );
}

/// Given a server which is unavailable
/// When a request is sent from a thread which blocks
/// Then it should be retried in the same way
#[test]
fn blocking_session_retries() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/busy")
        .with_status(504)
        .expect(3)
        .create();
    let session = BlockingRetryingSession::from_config(&config_with_retries(&server, 2)).unwrap();

    let response = session
        .post(&format!("{}/busy", server.url()), &Body::Json(json!({})))
        .unwrap();

    assert_eq!(response.status(), 504);
    mock.assert();
}

/// Given a server nobody is listening on
/// When a request is sent from a thread which blocks
/// Then every connection error should be returned once retries run out
#[test]
fn blocking_session_aggregates_connection_errors() {
    let config = unreachable_config(1);
    let session = BlockingRetryingSession::from_config(&config).unwrap();

    let error = session
        .get(&format!("{}/launch", config.endpoint()))
        .unwrap_err();

    assert_matches!(error, HttpError::RetriesExhausted { errors } if errors.len() == 2);
}
