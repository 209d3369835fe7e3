//! Wire transport
//!
//! The fetcher talks to upstreams through the [`Transport`] trait so retry,
//! rate limiting and extraction are independent of the HTTP client.

use crate::error::{Error, Result};
use crate::request::PageRequest;
use crate::types::Method;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;

/// A response as received, before classification
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body text
    pub body: String,
}

impl RawResponse {
    /// Check for a 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one page request and returns the raw response
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request. Errors here are transport-level (connect, timeout);
    /// HTTP error statuses come back as `Ok` responses.
    async fn send(&self, request: &PageRequest) -> Result<RawResponse>;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with fetchkit's user agent
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("fetchkit/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &PageRequest) -> Result<RawResponse> {
        let mut req = self.client.request(request.method.into(), &request.url);

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        req = match request.method {
            Method::GET if request.params.is_empty() => req,
            Method::GET => req.query(&request.params),
            Method::POST => req.json(&request.params),
        };

        let response = req.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(classify)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Connect failures get their own retryable variant; everything else stays a
/// client error
fn classify(e: reqwest::Error) -> Error {
    if e.is_connect() {
        Error::Connection {
            message: e.to_string(),
        }
    } else {
        Error::Http(e)
    }
}
