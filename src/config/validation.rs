//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, limits > 0, addresses parse)
//! - Check rate limit table keys (known methods and roles)
//! - Detect duplicate route names
//!
//! Returns every error found, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::{MethodLimits, ServiceConfig, PLACEHOLDER_API_KEY};

const KNOWN_METHODS: &[&str] = &["get", "head", "post", "put", "patch", "delete", "options"];
const KNOWN_ROLES: &[&str] = &["admin", "premium", "authenticated"];
const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// One year.
pub const MAX_DECAY_MINUTES: u64 = 525_600;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: String, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: String },

    #[error("{field}: must be at most {max}")]
    TooLarge { field: String, max: u64 },

    #[error("{field}: unknown HTTP method {method:?}")]
    UnknownMethod { field: String, method: String },

    #[error("{field}: unknown role {role:?}")]
    UnknownRole { field: String, role: String },

    #[error("routes: duplicate route name {0:?}")]
    DuplicateRoute(String),

    #[error("routes.{route}: {reason}")]
    InvalidRoute { route: String, reason: String },

    #[error("observability.log_format: unsupported format {0:?}")]
    UnknownLogFormat(String),

    #[error("admin.api_key: placeholder key must be replaced when the admin API is enabled")]
    PlaceholderApiKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_address(&mut errors, "upstream.address", &config.upstream.address);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs".into(),
        });
    }

    let mut names = HashSet::new();
    for route in &config.routes {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidRoute {
                route: route.name.clone(),
                reason: format!("path_prefix {:?} must start with '/'", route.path_prefix),
            });
        }
        if route.endpoint_type.trim().is_empty() {
            errors.push(ValidationError::InvalidRoute {
                route: route.name.clone(),
                reason: "endpoint_type must not be empty".into(),
            });
        }
    }

    let limits = &config.rate_limits;
    if limits.decay_minutes == 0 {
        errors.push(ValidationError::Zero {
            field: "rate_limits.decay_minutes".into(),
        });
    } else if limits.decay_minutes > MAX_DECAY_MINUTES {
        errors.push(ValidationError::TooLarge {
            field: "rate_limits.decay_minutes".into(),
            max: MAX_DECAY_MINUTES,
        });
    }
    for (endpoint_type, methods) in &limits.public {
        check_methods(&mut errors, &format!("rate_limits.public.{endpoint_type}"), methods);
    }
    for (tier, table) in [("authenticated", &limits.authenticated), ("admin", &limits.admin)] {
        for (endpoint_type, by_role) in table {
            for (role, methods) in by_role {
                let field = format!("rate_limits.{tier}.{endpoint_type}.{role}");
                if !KNOWN_ROLES.contains(&role.as_str()) {
                    errors.push(ValidationError::UnknownRole {
                        field: field.clone(),
                        role: role.clone(),
                    });
                }
                check_methods(&mut errors, &field, methods);
            }
        }
    }

    if config.store.timeout_ms == 0 {
        errors.push(ValidationError::Zero {
            field: "store.timeout_ms".into(),
        });
    }
    if config.store.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "store.sweep_interval_secs".into(),
        });
    }

    if !LOG_FORMATS.contains(&config.observability.log_format.as_str()) {
        errors.push(ValidationError::UnknownLogFormat(
            config.observability.log_format.clone(),
        ));
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key == PLACEHOLDER_API_KEY || config.admin.api_key.is_empty() {
            errors.push(ValidationError::PlaceholderApiKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn check_methods(errors: &mut Vec<ValidationError>, field: &str, methods: &MethodLimits) {
    for (method, limit) in methods {
        if !KNOWN_METHODS.contains(&method.as_str()) {
            errors.push(ValidationError::UnknownMethod {
                field: field.to_string(),
                method: method.clone(),
            });
        }
        if *limit == 0 {
            errors.push(ValidationError::Zero {
                field: format!("{field}.{method}"),
            });
        }
    }
}
