//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then sends real requests through
//! `WebClient` and the default `ureq` transport. Validates that encoding,
//! execution and classification line up with what a real server sees.

use std::net::SocketAddr;

use mock_server::Echo;
use webclient_core::{
    callbacks, oneshot_sink, DecodedPayload, ExecutionOutcome, ExecutionState, Failure, FailureKind,
    WebClient,
};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// Send `client` and wait for its outcome.
fn execute(client: WebClient) -> ExecutionOutcome {
    let (tx, rx) = oneshot_sink();
    client.send(tx);
    rx.blocking_recv().expect("no outcome delivered")
}

fn echo_of(outcome: ExecutionOutcome) -> Echo {
    match outcome.into_result().unwrap() {
        DecodedPayload::JsonObject(map) => serde_json::from_value(map.into()).unwrap(),
        other => panic!("expected JSON object, got {other:?}"),
    }
}

#[test]
fn get_with_query_data() {
    let addr = start_server();

    let client = WebClient::get(&format!("http://{addr}/echo"))
        .unwrap()
        .with_headers([("X-Token", "abc")])
        .with_query_or_body_data([("q", "a b")])
        .unwrap();
    let echo = echo_of(execute(client));

    assert_eq!(echo.method, "GET");
    assert_eq!(echo.query.as_deref(), Some("q=a%20b"));
    assert_eq!(echo.headers["x-token"], "abc");
    assert!(echo.body.is_empty());
}

#[test]
fn post_with_form_body() {
    let addr = start_server();

    let client = WebClient::post(&format!("http://{addr}/echo"))
        .unwrap()
        .with_query_or_body_data([("a", "1"), ("b", "x y")])
        .unwrap();
    let echo = echo_of(execute(client));

    assert_eq!(echo.method, "POST");
    assert_eq!(echo.query, None);
    assert_eq!(echo.body, "a=1&b=x%20y");
    assert_eq!(echo.headers["content-type"], "application/x-www-form-urlencoded");
    assert_eq!(echo.headers["content-length"], "11");
}

#[test]
fn post_with_multipart_upload() {
    let addr = start_server();

    let client = WebClient::post(&format!("http://{addr}/echo"))
        .unwrap()
        .with_headers([("Content-Type", "text/plain")])
        .with_multipart_upload(b"JPEGDATA", "photo", [("caption", "beach")])
        .unwrap();
    let echo = echo_of(execute(client));

    let content_type = &echo.headers["content-type"];
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type");
    assert!(boundary.starts_with("----WebKitFormBoundary"));
    assert!(echo.body.contains("Content-Disposition: form-data; name=\"caption\"\r\n\r\nbeach\r\n"));
    assert!(echo.body.contains("Content-Type: image/jpeg\r\n\r\nJPEGDATA\r\n"));
    assert!(echo.body.ends_with(&format!("--{boundary}--\r\n")));
}

#[test]
fn plain_text_response() {
    let addr = start_server();

    let outcome = execute(WebClient::get(&format!("http://{addr}/text")).unwrap());
    assert_eq!(
        outcome,
        ExecutionOutcome::Success { status: 200, payload: DecodedPayload::Text("plain text".to_string()) }
    );
}

#[test]
fn json_array_response() {
    let addr = start_server();

    let outcome = execute(WebClient::get(&format!("http://{addr}/array")).unwrap());
    assert_eq!(
        outcome.into_result().unwrap(),
        DecodedPayload::JsonArray(vec![1.into(), 2.into(), 3.into()])
    );
}

#[test]
fn malformed_json_is_status_zero() {
    let addr = start_server();

    let outcome = execute(WebClient::get(&format!("http://{addr}/bad-json")).unwrap());
    let failure = outcome.into_result().unwrap_err();
    assert_eq!(failure.code(), "0");
    assert_eq!(failure.kind, FailureKind::Decode);
}

#[test]
fn error_status_goes_to_failure_channel() {
    let addr = start_server();
    let (success_tx, success_rx) = std::sync::mpsc::channel::<DecodedPayload>();
    let (failure_tx, failure_rx) = std::sync::mpsc::channel::<Failure>();

    let handle = WebClient::send_post(
        &format!("http://{addr}/status/503"),
        callbacks(
            move |payload| success_tx.send(payload).unwrap(),
            move |failure| failure_tx.send(failure).unwrap(),
        ),
    )
    .unwrap();

    assert_eq!(handle.join(), ExecutionState::Delivered);
    assert_eq!(failure_rx.recv().unwrap().code(), "503");
    assert!(success_rx.recv().is_err());
}

#[test]
fn unregistered_2xx_status_is_delivered() {
    let addr = start_server();
    let (tx, rx) = oneshot_sink();

    let handle = WebClient::send_get(&format!("http://{addr}/status/299"), tx).unwrap();

    assert_eq!(handle.join(), ExecutionState::Delivered);
    assert_eq!(
        rx.blocking_recv().unwrap(),
        ExecutionOutcome::Success { status: 299, payload: DecodedPayload::Text("status 299".to_string()) }
    );
}

#[test]
fn connection_refused_is_status_zero() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let outcome = execute(WebClient::get(&format!("http://{addr}/echo")).unwrap());
    assert_eq!(outcome, ExecutionOutcome::Failure(Failure::transport()));
}

#[test]
fn cancelled_request_never_reaches_server() {
    let addr = start_server();

    let client = WebClient::get(&format!("http://{addr}/echo")).unwrap();
    assert!(client.cancel());
    let (tx, rx) = oneshot_sink();
    let handle = client.send(tx);

    assert_eq!(handle.join(), ExecutionState::Cancelled);
    assert!(rx.blocking_recv().is_err());

    let outcome = execute(WebClient::get(&format!("http://{addr}/hits")).unwrap());
    assert_eq!(outcome.into_result().unwrap(), DecodedPayload::Text("0".to_string()));
}
