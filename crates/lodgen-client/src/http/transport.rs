//! Transport seam between the request client and the network
//!
//! The client only ever talks to a `Transport` trait object, so tests can
//! script responses without a socket and production code rides on reqwest.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::Method;

/// A fully assembled request, ready to go on the wire
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// A raw response before classification
///
/// The body stays unparsed here; JSON parsing (and its failure mode) belongs
/// to the dispatch layer.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over the HTTP transport
///
/// Implementations surface transport-level failures (DNS, connection reset,
/// timeout) as `Error::NetworkFailure`; any response that made it back,
/// whatever its status, is an `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Production transport backed by reqwest
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::network("failed to create HTTP client", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| Error::network("invalid HTTP method", e))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::network(format!("request to {} failed", request.url), e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network("failed to read response body", e))?;

        Ok(TransportResponse { status, body })
    }
}
