//! Route lookup.
//!
//! # Responsibilities
//! - Compile `RouteConfig`s into an immutable table
//! - Find the route protecting a request path
//!
//! Order: higher `priority` first, then longer prefix, then declaration
//! order. First match wins.

use std::sync::Arc;

use crate::config::RouteConfig;
use crate::limiter::tier::Tier;
use crate::routing::matcher::PathPrefix;

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub prefix: PathPrefix,
    pub tier: Tier,
    pub endpoint_type: Arc<str>,
    pub require_auth: bool,
    priority: u32,
}

/// Immutable route table. Rebuilt on config reload.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn from_config(routes: &[RouteConfig]) -> Self {
        let mut compiled: Vec<Route> = routes
            .iter()
            .map(|r| Route {
                name: r.name.clone(),
                prefix: PathPrefix::new(r.path_prefix.as_str()),
                tier: r.tier,
                endpoint_type: Arc::from(r.endpoint_type.as_str()),
                require_auth: r.require_auth,
                priority: r.priority,
            })
            .collect();

        // Stable sort keeps declaration order among equals.
        compiled.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.prefix.specificity().cmp(&a.prefix.specificity()))
        });

        Self { routes: compiled }
    }

    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.prefix.matches(path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(name: &str, prefix: &str, tier: Tier, priority: u32) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            path_prefix: prefix.into(),
            tier,
            endpoint_type: "general".into(),
            priority,
            require_auth: false,
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::from_config(&[
            route("api", "/api", Tier::Authenticated, 0),
            route("login", "/api/login", Tier::Public, 0),
            route("root", "/", Tier::Public, 0),
        ]);
        assert_eq!(table.match_path("/api/login").unwrap().name, "login");
        assert_eq!(table.match_path("/api/users/1").unwrap().name, "api");
        assert_eq!(table.match_path("/health").unwrap().name, "root");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_priority_beats_specificity() {
        let table = RouteTable::from_config(&[
            route("specific", "/admin/users", Tier::Admin, 0),
            route("catch", "/admin", Tier::Admin, 10),
        ]);
        assert_eq!(table.match_path("/admin/users").unwrap().name, "catch");
    }

    #[test]
    fn test_no_match() {
        let table = RouteTable::from_config(&[route("api", "/api", Tier::Public, 0)]);
        assert!(table.match_path("/other").is_none());
        assert!(RouteTable::default().match_path("/").is_none());
    }
}
