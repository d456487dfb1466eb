//! Violation logging.
//!
//! Best effort: a sink failure is swallowed and never changes the decision
//! already taken for the request.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;

use crate::limiter::tier::Tier;

/// One rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationRecord {
    pub tier: Tier,
    pub principal_id: Option<String>,
    pub ip: IpAddr,
    pub user_agent: Option<String>,
    pub path: String,
    pub method: String,
    pub endpoint_type: String,
    pub key: String,
    pub limit: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("violation sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for violation records.
pub trait ViolationSink: Send + Sync {
    fn record(&self, violation: &ViolationRecord) -> Result<(), SinkError>;
}

/// Writes violations as WARN events on the `rate_gate::violation` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ViolationSink for TracingSink {
    fn record(&self, v: &ViolationRecord) -> Result<(), SinkError> {
        tracing::warn!(
            target: "rate_gate::violation",
            tier = %v.tier,
            principal_id = v.principal_id.as_deref(),
            ip = %v.ip,
            user_agent = v.user_agent.as_deref(),
            path = %v.path,
            method = %v.method,
            endpoint_type = %v.endpoint_type,
            key = %v.key,
            limit = v.limit,
            "Rate limit exceeded"
        );
        Ok(())
    }
}

/// Front for a [`ViolationSink`] that never fails.
#[derive(Clone)]
pub struct ViolationLogger {
    sink: Arc<dyn ViolationSink>,
}

impl Default for ViolationLogger {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl ViolationLogger {
    pub fn new(sink: Arc<dyn ViolationSink>) -> Self {
        Self { sink }
    }

    /// Record `violation` when `enabled`.
    pub fn log(&self, enabled: bool, violation: &ViolationRecord) {
        if !enabled {
            return;
        }
        if let Err(e) = self.sink.record(violation) {
            tracing::debug!(error = %e, key = %violation.key, "Dropped violation record");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that keeps everything it is given.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub records: Mutex<Vec<ViolationRecord>>,
    }

    impl ViolationSink for MemorySink {
        fn record(&self, violation: &ViolationRecord) -> Result<(), SinkError> {
            self.records.lock().unwrap().push(violation.clone());
            Ok(())
        }
    }

    /// Sink that always fails.
    pub(crate) struct BrokenSink;

    impl ViolationSink for BrokenSink {
        fn record(&self, _violation: &ViolationRecord) -> Result<(), SinkError> {
            Err(SinkError::Unavailable("disk full".into()))
        }
    }

    fn record() -> ViolationRecord {
        ViolationRecord {
            tier: Tier::Public,
            principal_id: None,
            ip: "127.0.0.1".parse().unwrap(),
            user_agent: Some("test".into()),
            path: "/login".into(),
            method: "POST".into(),
            endpoint_type: "auth".into(),
            key: "public_rate_limit:auth:127.0.0.1|9f86d081".into(),
            limit: 5,
        }
    }

    #[test]
    fn test_toggle_controls_logging() {
        let sink = Arc::new(MemorySink::default());
        let logger = ViolationLogger::new(sink.clone());

        logger.log(false, &record());
        assert!(sink.records.lock().unwrap().is_empty());

        logger.log(true, &record());
        assert_eq!(sink.records.lock().unwrap().as_slice(), &[record()]);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let logger = ViolationLogger::new(Arc::new(BrokenSink));
        logger.log(true, &record());
        ViolationLogger::default().log(true, &record());
    }
}
