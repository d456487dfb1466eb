use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// The `X-RateLimit-*` headers of a gateway response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u32,
    pub remaining: u64,
    /// Epoch seconds at which the window resets.
    pub reset: u64,
}

impl RateLimitHeaders {
    /// `None` unless all three headers are present and numeric.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        fn number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
            headers.get(name)?.to_str().ok()?.trim().parse().ok()
        }

        Some(Self {
            limit: number(headers, "x-ratelimit-limit")?,
            remaining: number(headers, "x-ratelimit-remaining")?,
            reset: number(headers, "x-ratelimit-reset")?,
        })
    }
}

/// Body of a 429 from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    pub error: String,
    pub message: String,
    pub retry_after: u64,
    pub limit: u32,
    /// `public_rate_limit`, `authenticated_rate_limit` or `admin_rate_limit`.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("rate limited: {} (retry after {}s)", .0.message, .0.retry_after)]
    RateLimited(Denial),

    #[error("gateway returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Seconds to wait before retrying, when the gateway said so.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ClientError::RateLimited(denial) => Some(denial.retry_after),
            _ => None,
        }
    }
}

pub struct GatewayClient {
    client: Client,
    gateway_url: String,
}

impl GatewayClient {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            client: Client::new(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        }
    }

    /// Use a preconfigured `reqwest::Client` (proxies, timeouts, TLS).
    pub fn with_client(client: Client, gateway_url: &str) -> Self {
        Self {
            client,
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response, ClientError> {
        self.send(Method::GET, path).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, ClientError> {
        let res = self
            .client
            .post(format!("{}{}", self.gateway_url, path))
            .json(body)
            .send()
            .await?;
        check(res).await
    }

    /// Send a request; 429s and other failures come back as [`ClientError`].
    pub async fn send(&self, method: Method, path: &str) -> Result<Response, ClientError> {
        let res = self
            .client
            .request(method, format!("{}{}", self.gateway_url, path))
            .send()
            .await?;
        check(res).await
    }
}

async fn check(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let header_retry = res
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let body = res.text().await?;

    if status == StatusCode::TOO_MANY_REQUESTS {
        if let Ok(denial) = serde_json::from_str::<Denial>(&body) {
            return Err(ClientError::RateLimited(denial));
        }
        if let Some(retry_after) = header_retry {
            return Err(ClientError::RateLimited(Denial {
                error: "Too Many Requests".to_string(),
                message: body,
                retry_after,
                limit: 0,
                kind: String::new(),
            }));
        }
    }

    Err(ClientError::Status { status, body })
}
