//! Resilient request client
//!
//! This module provides the request stack that mediates every network call:
//! - Per-endpoint sliding-window rate limiting
//! - Bearer/CSRF header assembly with a single 401 refresh-and-retry
//! - Response classification into a closed error taxonomy
//! - Page- and cursor-based pagination helpers with a TTL-bounded cache
//! - Batched and schema-validated request variants

pub mod auth;
pub mod batch;
pub mod cache;
pub mod client;
pub mod pagination;
pub mod rate_limit;
pub mod transport;
pub mod validate;

pub use auth::{AuthSession, CsrfTokenProvider, StaticCsrfToken};
pub use cache::{cache_key, CacheConfig, PaginationCache};
pub use client::{ApiClient, ClientConfig};
pub use pagination::{normalize_cursor_page, normalize_page_result};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use validate::Schema;
