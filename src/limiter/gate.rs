//! The rate limit gate.
//!
//! # Pipeline
//! ```text
//! RequestMeta + endpoint_type
//!     → admin check (admin tier only, 403 before any counting)
//!     → key (tier strategy)
//!     → policy (re-resolved from the live config on every request)
//!     → store.attempt (check-and-increment)
//!         Counted  → downstream, then X-RateLimit-* headers
//!         Exceeded → violation log, 429
//!         Err      → fail open (no headers) or closed (503) per tier
//! ```

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::config::{FailureMode, ServiceConfig, SharedConfig};
use crate::identity::{classify, is_admin};
use crate::limiter::decision::{
    forbidden_response, unavailable_response, Decision, RateLimitSnapshot, Violation,
};
use crate::limiter::key::RateLimitKey;
use crate::limiter::policy::{self, PolicyConfig};
use crate::limiter::request::RequestMeta;
use crate::limiter::tier::{Tier, TierConfig};
use crate::limiter::violation::{ViolationLogger, ViolationRecord};
use crate::observability::metrics;
use crate::store::{Attempt, Clock, CounterStore, SystemClock};

/// One gate per tier. Cheap to share behind an `Arc`.
pub struct RateLimitGate {
    tier: TierConfig,
    store: Arc<dyn CounterStore>,
    config: SharedConfig,
    clock: Arc<dyn Clock>,
    violations: ViolationLogger,
}

impl RateLimitGate {
    pub fn new(tier: TierConfig, store: Arc<dyn CounterStore>, config: SharedConfig) -> Self {
        Self {
            tier,
            store,
            config,
            clock: Arc::new(SystemClock),
            violations: ViolationLogger::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_violation_logger(mut self, violations: ViolationLogger) -> Self {
        self.violations = violations;
        self
    }

    pub fn tier(&self) -> Tier {
        self.tier.tier
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Decide on a request. An `Allowed` decision has already been counted.
    pub async fn evaluate(&self, meta: &RequestMeta, endpoint_type: &str) -> Decision {
        let config = self.config.load_full();
        self.decide(&config, meta, endpoint_type).await
    }

    /// Run the full pipeline around `downstream`.
    pub async fn handle<F, Fut>(
        &self,
        request: Request<Body>,
        endpoint_type: &str,
        downstream: F,
    ) -> Response
    where
        F: FnOnce(Request<Body>) -> Fut,
        Fut: Future<Output = Response>,
    {
        let config = self.config.load_full();
        let meta = RequestMeta::from_request(&request, config.listener.trust_forwarded_for);
        let decision = self.decide(&config, &meta, endpoint_type).await;
        metrics::record_decision(self.tier.tier, endpoint_type, decision.outcome());
        if !decision.is_allowed() {
            tracing::debug!(
                tier = %self.tier.tier,
                path = %meta.path,
                outcome = decision.outcome(),
                "Request rejected"
            );
        }

        let add_headers = config.rate_limits.add_headers;
        match decision {
            Decision::Allowed(snapshot) => {
                let mut response = downstream(request).await;
                if add_headers {
                    snapshot.apply(response.headers_mut());
                }
                response
            }
            Decision::Bypassed => downstream(request).await,
            Decision::Forbidden => forbidden_response(),
            Decision::TooManyRequests(violation) => violation.into_response(add_headers),
            Decision::Unavailable => unavailable_response(),
        }
    }

    async fn decide(
        &self,
        config: &ServiceConfig,
        meta: &RequestMeta,
        endpoint_type: &str,
    ) -> Decision {
        let principal = meta.principal();

        if self.tier.requires_admin && !principal.is_some_and(is_admin) {
            tracing::debug!(
                tier = %self.tier.tier,
                path = %meta.path,
                principal_id = ?principal.map(|p| p.id()),
                "Admin access required"
            );
            return Decision::Forbidden;
        }

        let key = RateLimitKey::for_request(
            self.tier.tier,
            self.tier.key_strategy,
            endpoint_type,
            meta.ip,
            meta.user_agent.as_deref(),
            principal,
        );
        let role = classify(principal);
        let policy = policy::resolve(
            &config.rate_limits,
            self.tier.tier,
            endpoint_type,
            role,
            &meta.method,
        );

        let attempt = self
            .store
            .attempt(key.as_str(), u64::from(policy.max_attempts), policy.decay_window)
            .await;
        let now = self.clock.now_secs();

        match attempt {
            Ok(attempt) => {
                let snapshot = RateLimitSnapshot::new(
                    policy.max_attempts,
                    attempt.count(),
                    now,
                    attempt.available_in(),
                );
                match attempt {
                    Attempt::Counted { count, .. } => {
                        tracing::trace!(key = %key, count, limit = policy.max_attempts, "Attempt counted");
                        Decision::Allowed(snapshot)
                    }
                    Attempt::Exceeded { available_in, .. } => {
                        self.report_violation(config, meta, endpoint_type, &key, &policy);
                        Decision::TooManyRequests(Violation {
                            tier: self.tier.tier,
                            limit: policy.max_attempts,
                            retry_after: available_in,
                            snapshot,
                        })
                    }
                }
            }
            Err(e) => {
                metrics::record_store_error(e.kind());
                let mode = config.store.failure_mode.for_tier(self.tier.tier);
                tracing::error!(
                    error = %e,
                    tier = %self.tier.tier,
                    key = %key,
                    failure_mode = ?mode,
                    "Counter store failed"
                );
                match mode {
                    FailureMode::Open => Decision::Bypassed,
                    FailureMode::Closed => Decision::Unavailable,
                }
            }
        }
    }

    fn report_violation(
        &self,
        config: &ServiceConfig,
        meta: &RequestMeta,
        endpoint_type: &str,
        key: &RateLimitKey,
        policy: &PolicyConfig,
    ) {
        metrics::record_violation(self.tier.tier, endpoint_type);
        let record = ViolationRecord {
            tier: self.tier.tier,
            principal_id: meta.principal().map(|p| p.id()),
            ip: meta.ip,
            user_agent: meta.user_agent.clone(),
            path: meta.path.clone(),
            method: meta.method.to_string(),
            endpoint_type: endpoint_type.to_string(),
            key: key.to_string(),
            limit: policy.max_attempts,
        };
        self.violations.log(config.rate_limits.log_violations, &record);
    }
}

/// The three gates sharing one store and one live config.
#[derive(Clone)]
pub struct TierGates {
    pub public: Arc<RateLimitGate>,
    pub authenticated: Arc<RateLimitGate>,
    pub admin: Arc<RateLimitGate>,
}

impl TierGates {
    pub fn new(store: Arc<dyn CounterStore>, config: SharedConfig) -> Self {
        Self::build(store, config, |gate| gate)
    }

    /// Build all three gates, letting `customize` adjust each one.
    pub fn build<F>(store: Arc<dyn CounterStore>, config: SharedConfig, customize: F) -> Self
    where
        F: Fn(RateLimitGate) -> RateLimitGate,
    {
        let [public, authenticated, admin] = Tier::ALL.map(|tier| {
            let gate = RateLimitGate::new(TierConfig::for_tier(tier), store.clone(), config.clone());
            Arc::new(customize(gate))
        });
        Self {
            public,
            authenticated,
            admin,
        }
    }

    pub fn for_tier(&self, tier: Tier) -> &Arc<RateLimitGate> {
        match tier {
            Tier::Public => &self.public,
            Tier::Authenticated => &self.authenticated,
            Tier::Admin => &self.admin,
        }
    }
}
