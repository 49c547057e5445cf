//! Core request dispatch with the single-retry auth protocol
//!
//! `ApiClient` composes headers, applies the rate limiter, performs the
//! network call through the transport seam, classifies the response, and
//! runs the 401 refresh-and-retry protocol exactly once per call.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, ErrorKind, Result};
use crate::http::auth::{AuthSession, CsrfTokenProvider};
use crate::http::cache::{CacheConfig, PaginationCache};
use crate::http::rate_limit::{RateLimitConfig, RateLimiter};
use crate::http::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
use crate::types::RequestOptions;

/// Server-side phrasings that signal an expired token even outside the 401
/// path (some backends encode expiry in a 200-level envelope).
const EXPIRED_TOKEN_MARKERS: &[&str] = &["jwt expired", "token expired"];

/// Configuration for the request client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend
    pub base_url: String,
    /// Fixed public credential attached to unauthenticated calls
    pub public_api_key: String,
    /// Transport timeout in seconds
    pub timeout_secs: u64,
    /// Sliding-window admission policy
    pub rate_limit: RateLimitConfig,
    /// Pagination cache policy
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            public_api_key: String::new(),
            timeout_secs: 30,
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, public_api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            public_api_key: public_api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url).map_err(|e| Error::Unknown {
            message: format!("invalid base URL '{}': {}", self.base_url, e),
            status: None,
        })?;
        self.rate_limit.validate().map_err(|m| Error::Unknown {
            message: m,
            status: None,
        })?;
        self.cache.validate().map_err(|m| Error::Unknown {
            message: m,
            status: None,
        })?;
        Ok(())
    }
}

/// States of the 401 refresh-and-retry protocol. The contract is exactly one
/// retry, never recursive; the machine makes an accidental second retry
/// structurally impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryState {
    Initial,
    AwaitingRefresh,
    Retried,
}

/// Resilient request client
///
/// Owns no per-call state; the rate limiter and pagination cache are the
/// only shared mutable state, constructed here once per client so tests get
/// fresh instances instead of hidden globals.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthSession>,
    csrf: Arc<dyn CsrfTokenProvider>,
    rate_limiter: RateLimiter,
    cache: PaginationCache,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a client backed by the reqwest transport
    pub fn new(
        config: ClientConfig,
        auth: Arc<dyn AuthSession>,
        csrf: Arc<dyn CsrfTokenProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(config.timeout_secs)?);
        Ok(Self::with_transport(config, auth, csrf, transport))
    }

    /// Create a client with an injected transport (tests, instrumentation)
    pub fn with_transport(
        config: ClientConfig,
        auth: Arc<dyn AuthSession>,
        csrf: Arc<dyn CsrfTokenProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit.clone());
        let cache = PaginationCache::new(config.cache.clone());
        Self {
            transport,
            auth,
            csrf,
            rate_limiter,
            cache,
            config,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &PaginationCache {
        &self.cache
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute a request and deserialize the payload into `T`
    pub async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let value = self.execute_value(endpoint, options).await?;
        serde_json::from_value(value).map_err(|e| Error::Unknown {
            message: format!("response did not match the expected shape: {}", e),
            status: None,
        })
    }

    /// Execute a request, returning the raw JSON payload
    ///
    /// The rate-limit admission is consumed here regardless of the eventual
    /// outcome; the 401 retry does not consume a second slot.
    pub async fn execute_value(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        if !self.rate_limiter.check(endpoint) {
            let retry_after = self.rate_limiter.remaining_time(endpoint);
            warn!(endpoint, ?retry_after, "request rejected by client-side rate limiter");
            return Err(Error::RateLimited {
                message: ErrorKind::RateLimited.default_message().to_string(),
                retry_after: Some(retry_after),
            });
        }

        let url = self.build_url(endpoint, &options)?;

        let mut token = if options.use_auth {
            match self.auth.access_token().await? {
                Some(token) => token,
                None => {
                    // Never silently downgrade a protected call to the
                    // public credential.
                    return Err(Error::AuthExpired {
                        message: "no access token available".to_string(),
                    });
                }
            }
        } else {
            self.config.public_api_key.clone()
        };

        let mut state = RetryState::Initial;
        loop {
            let request = self.build_request(&url, &options, &token);
            debug!(endpoint, method = %options.method, ?state, "dispatching request");
            let response = self.transport.send(request).await?;

            if response.status == 401 && options.use_auth && state == RetryState::Initial {
                state = RetryState::AwaitingRefresh;
                debug!(endpoint, "401 received, attempting session refresh");
                match self.auth.refresh().await {
                    Ok(Some(new_token)) => {
                        token = new_token;
                        state = RetryState::Retried;
                        continue;
                    }
                    Ok(None) | Err(_) => {
                        warn!(endpoint, "session refresh failed");
                        self.auth.on_auth_failure(endpoint);
                        return Err(Error::AuthExpired {
                            message: ErrorKind::AuthExpired.default_message().to_string(),
                        });
                    }
                }
            }

            return self.classify(endpoint, &options, state, response);
        }
    }

    /// Invalidate cached pages for the given endpoint prefixes. Call after a
    /// successful mutating request that affects those listings.
    pub fn invalidate_after_mutation(&self, endpoints: &[&str]) {
        for endpoint in endpoints {
            self.cache.invalidate_prefix(endpoint);
        }
    }

    fn build_url(&self, endpoint: &str, options: &RequestOptions) -> Result<String> {
        let joined = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined).map_err(|e| Error::Unknown {
            message: format!("invalid request URL '{}': {}", joined, e),
            status: None,
        })?;
        if !options.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &options.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.into())
    }

    fn build_request(&self, url: &str, options: &RequestOptions, token: &str) -> TransportRequest {
        let mut headers = vec![(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )];
        headers.extend(options.headers.iter().cloned());
        headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        if options.method.is_mutating() {
            headers.push(("X-CSRF-Token".to_string(), self.csrf.token()));
        }

        TransportRequest {
            method: options.method,
            url: url.to_string(),
            headers,
            body: options.body.clone(),
        }
    }

    fn classify(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        state: RetryState,
        response: TransportResponse,
    ) -> Result<Value> {
        let payload: Value = if response.body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response.body).map_err(|e| {
                Error::network(
                    format!("failed to parse response body as JSON: {}", e),
                    e,
                )
            })?
        };

        let server_message = extract_server_message(&payload);

        // Some servers report expiry inside an otherwise ordinary envelope.
        let mut reported = false;
        if let Some(message) = &server_message {
            if is_expired_token_message(message) {
                warn!(endpoint, "server reported an expired token");
                self.auth.on_auth_failure(endpoint);
                reported = true;
            }
        }

        if response.is_success() {
            return Ok(payload);
        }

        if response.status == 401 && options.use_auth && state == RetryState::Retried && !reported
        {
            // The retried request was rejected again; report once and stop.
            self.auth.on_auth_failure(endpoint);
        }

        Err(Error::from_status(response.status, server_message))
    }
}

/// Pull the human-readable message out of the usual error envelopes:
/// `{"message": …}`, `{"error": "…"}`, or `{"error": {"message": …}}`.
fn extract_server_message(payload: &Value) -> Option<String> {
    if let Some(message) = payload.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }
    match payload.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(error) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map(|s| s.to_string()),
        None => None,
    }
}

fn is_expired_token_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    EXPIRED_TOKEN_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
