use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::limiter::decision::error_response;
use crate::store::StoreError;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub routes: usize,
    pub upstream: String,
    pub decay_minutes: u64,
}

#[derive(Debug, Serialize)]
pub struct LimitStatus {
    pub key: String,
    pub attempts: u64,
    pub available_in: u64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let config = state.config.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        routes: state.routes.load().len(),
        upstream: config.upstream.address.clone(),
        decay_minutes: config.rate_limits.decay_minutes,
    })
}

pub async fn get_limit(State(state): State<AdminState>, Path(key): Path<String>) -> Response {
    let lookup = async {
        let attempts = state.store.attempts(&key).await?;
        let available_in = state.store.available_in(&key).await?;
        Ok::<_, StoreError>((attempts, available_in))
    };

    match lookup.await {
        Ok((attempts, available_in)) => Json(LimitStatus {
            key,
            attempts,
            available_in,
        })
        .into_response(),
        Err(e) => store_failure(&key, e),
    }
}

pub async fn clear_limit(State(state): State<AdminState>, Path(key): Path<String>) -> Response {
    match state.store.clear(&key).await {
        Ok(()) => {
            tracing::info!(key = %key, "Rate limit counter cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => store_failure(&key, e),
    }
}

fn store_failure(key: &str, error: StoreError) -> Response {
    tracing::error!(key = %key, error = %error, "Admin store operation failed");
    error_response(
        StatusCode::SERVICE_UNAVAILABLE,
        "Service Unavailable",
        "Counter store is unavailable.",
    )
}
