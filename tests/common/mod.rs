//! Shared utilities for integration tests.

use axum::{routing::get, Router};
use std::time::Duration;
use tokio::net::TcpListener;

/// Reserve a free local address by binding and releasing it.
pub async fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().to_string()
}

/// Router whose only handler takes `delay` to answer.
#[allow(dead_code)]
pub fn slow_router(delay: Duration) -> Router {
    Router::new().route(
        "/",
        get(move || async move {
            tokio::time::sleep(delay).await;
            "hello\n"
        }),
    )
}
