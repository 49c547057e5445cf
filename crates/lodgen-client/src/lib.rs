//! Lodgen request client — the resilient network layer of the Lodgen
//! property-management platform.
//!
//! Every backend call the application makes goes through [`ApiClient`]:
//! request dispatch, authentication-token lifecycle, per-endpoint rate
//! limiting, CSRF injection, cursor-based pagination with a time-bounded
//! cache, and batched/validated request variants.
//!
//! # Main Components
//!
//! - **Error taxonomy**: a closed set of classifications callers can match
//!   on, built with `thiserror`
//! - **Rate limiting**: sliding-window admission per endpoint, checked
//!   before any network call
//! - **Auth protocol**: bearer-token assembly with exactly one
//!   refresh-and-retry on 401
//! - **Pagination**: offset and cursor helpers behind uniform page types,
//!   with an opt-in TTL cache for cursor reads
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lodgen_client::{ApiClient, ClientConfig, RequestOptions, StaticCsrfToken};
//! # use lodgen_client::{AuthSession, Result};
//! # async fn example(session: Arc<dyn AuthSession>) -> Result<()> {
//! let config = ClientConfig::new("https://api.lodgen.example", "public-anon-key");
//! let client = ApiClient::new(config, session, Arc::new(StaticCsrfToken::new("csrf")))?;
//!
//! let unit: serde_json::Value = client.execute("/units/12", RequestOptions::default()).await?;
//! # let _ = unit;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod types;

// Re-export main types for convenience
pub use error::{Error, ErrorKind, FieldError, Result};
pub use http::{
    ApiClient, AuthSession, CacheConfig, ClientConfig, CsrfTokenProvider, PaginationCache,
    RateLimitConfig, RateLimiter, Schema, StaticCsrfToken, Transport,
};
pub use types::{
    BatchOutcome, BatchRequest, CursorPage, CursorQuery, Method, PageResult, RequestOptions,
    SortOrder,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
