//! End-to-end behaviour of the gateway over TCP.

use std::time::Duration;

use rate_gate::HttpServer;
use reqwest::StatusCode;
use sdk_rust::{ClientError, Denial, GatewayClient, RateLimitHeaders};

mod common;

#[tokio::test]
async fn test_public_login_limited_after_five_posts() {
    let upstream = common::start_mock_upstream("welcome").await;
    let gateway = common::start_gateway(HttpServer::new(common::gateway_config(upstream))).await;
    let client = common::client();

    for expected_remaining in (0..5).rev() {
        let res = client.post(gateway.url("/login")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let headers = RateLimitHeaders::from_headers(res.headers()).unwrap();
        assert_eq!(headers.limit, 5);
        assert_eq!(headers.remaining, expected_remaining);
        assert_eq!(res.text().await.unwrap(), "welcome");
    }

    let res = client.post(gateway.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().get("retry-after").is_some());
    let headers = RateLimitHeaders::from_headers(res.headers()).unwrap();
    assert_eq!(headers.remaining, 0);

    let denial: Denial = res.json().await.unwrap();
    assert_eq!(denial.error, "Too Many Requests");
    assert_eq!(denial.message, "Too many requests. Please try again later.");
    assert_eq!(denial.kind, "public_rate_limit");
    assert_eq!(denial.limit, 5);
    assert!(denial.retry_after >= 1 && denial.retry_after <= 60);

    // GET on the same endpoint type has its own bucket.
    let res = client.get(gateway.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_user_agents_get_separate_public_buckets() {
    let upstream = common::start_mock_upstream("ok").await;
    let gateway = common::start_gateway(HttpServer::new(common::gateway_config(upstream))).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client
            .post(gateway.url("/login"))
            .header("user-agent", "first/1.0")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = client
        .post(gateway.url("/login"))
        .header("user-agent", "first/1.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let res = client
        .post(gateway.url("/login"))
        .header("user-agent", "second/2.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_route_requires_admin() {
    let upstream = common::start_mock_upstream("users").await;
    let gateway = common::start_gateway(HttpServer::new(common::gateway_config(upstream))).await;
    let client = common::client();

    let res = client.get(gateway.url("/admin/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(body["message"], "Admin access required.");

    let res = client
        .get(gateway.url("/admin/users"))
        .header("x-auth-user-id", "7")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(gateway.url("/admin/users"))
        .header("x-auth-user-id", "1")
        .header("x-auth-user-role", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-ratelimit-limit"], "200");
    assert_eq!(res.headers()["x-ratelimit-remaining"], "199");
}

#[tokio::test]
async fn test_role_selects_authenticated_limit() {
    let upstream = common::start_mock_upstream("results").await;
    let gateway = common::start_gateway(HttpServer::new(common::gateway_config(upstream))).await;
    let client = common::client();

    let res = client
        .get(gateway.url("/api/search?q=rust"))
        .header("x-auth-user-id", "42")
        .header("x-auth-user-premium", "true")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-ratelimit-limit"], "50");

    let res = client
        .get(gateway.url("/api/search?q=rust"))
        .header("x-auth-user-id", "43")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-ratelimit-limit"], "30");

    // No caller: guest key, `authenticated` role limits.
    let res = client.get(gateway.url("/api/orders")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-ratelimit-limit"], "100");
}

#[tokio::test]
async fn test_unrouted_and_unauthenticated() {
    let upstream = common::start_mock_upstream("me").await;
    let gateway = common::start_gateway(HttpServer::new(common::gateway_config(upstream))).await;
    let client = common::client();

    let res = client.get(gateway.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().get("x-request-id").is_some());

    let res = client.get(gateway.url("/api/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Unauthenticated");

    let res = client
        .get(gateway.url("/api/me"))
        .header("x-auth-user-id", "42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_config_update_applies_to_next_request() {
    let upstream = common::start_mock_upstream("page").await;
    let config = common::gateway_config(upstream);
    let gateway = common::start_gateway(HttpServer::new(config.clone())).await;
    let client = common::client();

    let res = client.get(gateway.url("/pages/1")).send().await.unwrap();
    assert_eq!(res.headers()["x-ratelimit-limit"], "60");

    let mut next = config;
    next.rate_limits
        .public
        .get_mut("general")
        .unwrap()
        .insert("get".into(), 2);
    gateway.updates.send(next).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The counter survives the reload: this is the second hit.
    let res = client.get(gateway.url("/pages/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-ratelimit-limit"], "2");
    assert_eq!(res.headers()["x-ratelimit-remaining"], "0");

    let res = client.get(gateway.url("/pages/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_sdk_surfaces_denials() {
    let upstream = common::start_mock_upstream("ok").await;
    let gateway = common::start_gateway(HttpServer::new(common::gateway_config(upstream))).await;
    let sdk = GatewayClient::with_client(common::client(), &gateway.url(""));

    for _ in 0..5 {
        sdk.post("/login", &serde_json::json!({"user": "a"}))
            .await
            .unwrap();
    }
    match sdk.post("/login", &serde_json::json!({"user": "a"})).await {
        Err(ClientError::RateLimited(denial)) => {
            assert_eq!(denial.kind, "public_rate_limit");
            assert_eq!(denial.limit, 5);
        }
        other => panic!("expected a denial, got {other:?}"),
    }
}
