//! Concurrent requests against one key never overshoot the limit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rate_gate::HttpServer;
use reqwest::StatusCode;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_admit_exactly_the_limit() {
    let upstream = common::start_mock_upstream("ok").await;
    let gateway = common::start_gateway(HttpServer::new(common::gateway_config(upstream))).await;

    // Public general GET allows 60 per window.
    let concurrency = 20;
    let requests_per_task = 5;
    let allowed = Arc::new(AtomicUsize::new(0));
    let limited = Arc::new(AtomicUsize::new(0));

    let client = common::client();
    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = gateway.url("/pages/home");
        let allowed = allowed.clone();
        let limited = limited.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..requests_per_task {
                let res = client.get(&url).send().await.unwrap();
                match res.status() {
                    StatusCode::OK => allowed.fetch_add(1, Ordering::SeqCst),
                    StatusCode::TOO_MANY_REQUESTS => limited.fetch_add(1, Ordering::SeqCst),
                    other => panic!("unexpected status {other}"),
                };
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(allowed.load(Ordering::SeqCst), 60);
    assert_eq!(limited.load(Ordering::SeqCst), 40);
}
