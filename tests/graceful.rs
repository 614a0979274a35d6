//! Graceful shutdown against a real HTTP server.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use netkit::http::{echo_router, graceful, GracefulError, HttpServer, ServeError};

mod common;

#[tokio::test]
async fn test_clean_shutdown() {
    let addr = common::free_addr().await;
    let server = Arc::new(HttpServer::new(addr, echo_router(Duration::from_secs(5))));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move { trigger.cancel() });

    let result = graceful(cancel, server, Duration::from_secs(1)).await;
    assert!(result.is_ok(), "unexpected outcome: {:?}", result);
}

#[tokio::test]
async fn test_serves_then_stops() {
    let addr = common::free_addr().await;
    let server = Arc::new(HttpServer::new(addr.clone(), echo_router(Duration::from_secs(5))));
    let cancel = CancellationToken::new();
    let run = tokio::spawn(graceful(cancel.clone(), server, Duration::from_secs(1)));

    tokio::time::sleep(Duration::from_millis(200)).await;
    let body = reqwest::Client::new()
        .post(format!("http://{}/ping", addr))
        .body("payload")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "POST /ping\npayload");

    cancel.cancel();
    cancel.cancel();
    let result = run.await.unwrap();
    assert!(result.is_ok(), "unexpected outcome: {:?}", result);
}

#[tokio::test]
async fn test_in_flight_request_exceeds_deadline() {
    let addr = common::free_addr().await;
    let server = Arc::new(HttpServer::new(
        addr.clone(),
        common::slow_router(Duration::from_secs(3)),
    ));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let request = tokio::spawn(reqwest::get(format!("http://{}/", addr)));
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
        let _ = request.await;
    });

    let result = graceful(cancel, server, Duration::from_millis(100)).await;
    match result {
        Err(GracefulError::Shutdown(e)) => assert!(e.is_timeout()),
        other => panic!("expected shutdown deadline error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bind_failure_is_returned() {
    let addr = common::free_addr().await;
    let _occupied = tokio::net::TcpListener::bind(&addr).await.unwrap();
    let server = Arc::new(HttpServer::new(addr.clone(), echo_router(Duration::from_secs(5))));

    let cancel = CancellationToken::new();
    let result = graceful(cancel.clone(), server.clone(), Duration::from_secs(1)).await;

    match result {
        Err(GracefulError::Serve(ServeError::Bind { address, source })) => {
            assert_eq!(address, addr);
            assert_eq!(source.kind(), std::io::ErrorKind::AddrInUse);
        }
        other => panic!("expected bind error, got {:?}", other),
    }
    assert!(!cancel.is_cancelled());
    assert!(!server.is_closed(), "no shutdown should have been requested");
}
