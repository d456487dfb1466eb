//! Admin API.
//!
//! ```text
//! GET    /admin/status        version, route count, upstream
//! GET    /admin/limits/{key}  attempts and seconds until reset
//! DELETE /admin/limits/{key}  reset the counter
//! ```
//!
//! Every route requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::SharedConfig;
use crate::routing::RouteTable;
use crate::store::CounterStore;

#[derive(Clone)]
pub struct AdminState {
    pub config: SharedConfig,
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub store: Arc<dyn CounterStore>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/limits/{*key}", get(get_limit).delete(clear_limit))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{shared, ServiceConfig};
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    const KEY: &str = "test-admin-key";

    fn setup() -> (Router, MemoryStore) {
        let mut config = ServiceConfig::default();
        config.admin.api_key = KEY.into();
        let store = MemoryStore::new();
        let router = setup_admin_router(AdminState {
            config: shared(config),
            routes: Arc::new(ArcSwap::from_pointee(RouteTable::default())),
            store: Arc::new(store.clone()),
        });
        (router, store)
    }

    fn request(method: Method, uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {key}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(res: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(res.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_requires_bearer_key() {
        let (router, _) = setup();
        let res = router
            .clone()
            .oneshot(request(Method::GET, "/admin/status", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = router
            .oneshot(request(Method::GET, "/admin/status", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status() {
        let (router, _) = setup();
        let res = router
            .oneshot(request(Method::GET, "/admin/status", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json(res).await;
        assert_eq!(body["status"], "operational");
        assert_eq!(body["routes"], 0);
    }

    #[tokio::test]
    async fn test_inspect_and_reset() {
        let (router, store) = setup();
        let key = "public_rate_limit:auth:10.0.0.1|e3b0c442";
        for _ in 0..3 {
            store.hit(key, Duration::from_secs(60)).await.unwrap();
        }

        let uri = "/admin/limits/public_rate_limit:auth:10.0.0.1%7Ce3b0c442";
        let res = router
            .clone()
            .oneshot(request(Method::GET, uri, Some(KEY)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json(res).await;
        assert_eq!(body["key"], key);
        assert_eq!(body["attempts"], 3);
        assert!(body["available_in"].as_u64().unwrap() <= 60);

        let res = router
            .oneshot(request(Method::DELETE, uri, Some(KEY)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(store.attempts(key).await.unwrap(), 0);
    }
}
