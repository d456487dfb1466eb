//! Request attributes consumed by a gate.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request};

use crate::identity::{Caller, Principal};

/// What a gate needs to know about one request.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub method: Method,
    pub path: String,
    pub ip: IpAddr,
    pub user_agent: Option<String>,
    pub caller: Option<Caller>,
}

impl RequestMeta {
    /// Collect attributes from an axum request.
    ///
    /// The client IP comes from the connection (`ConnectInfo`), or from the
    /// first `X-Forwarded-For` hop when `trust_forwarded_for` is set. Without
    /// either it is `0.0.0.0`.
    pub fn from_request(request: &Request<Body>, trust_forwarded_for: bool) -> Self {
        let headers = request.headers();
        let forwarded = if trust_forwarded_for {
            forwarded_for(headers)
        } else {
            None
        };
        let ip = forwarded
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        Self {
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            ip,
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            caller: request.extensions().get::<Caller>().cloned(),
        }
    }

    pub fn principal(&self) -> Option<&dyn Principal> {
        self.caller.as_ref().map(Caller::principal)
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|hop| hop.trim().parse().ok())
}
