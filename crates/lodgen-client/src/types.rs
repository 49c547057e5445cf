//! Core data types for request dispatch and pagination
//!
//! Request descriptors are built fresh per call and never reused; the page
//! types are the only response envelopes callers ever see (envelope
//! variation is absorbed in `http::pagination`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// HTTP methods supported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// State-changing verbs require a CSRF token and must never read or
    /// populate the pagination cache.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Method::Post | Method::Put | Method::Patch | Method::Delete
        )
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call request descriptor
///
/// Constructed fresh for each invocation; the endpoint path itself is passed
/// separately since it doubles as the rate-limiter bucket key.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Caller-supplied headers, merged after the defaults
    pub headers: Vec<(String, String)>,
    /// Query parameters appended to the endpoint path
    pub query: Vec<(String, String)>,
    /// JSON request body
    pub body: Option<Value>,
    /// Attach the session bearer token (true) or the public API key (false)
    pub use_auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::Get,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            use_auth: true,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize any payload into the JSON body. A payload that cannot be
    /// represented as JSON fails as `ValidationFailed` before any dispatch.
    pub fn with_json_body<B: Serialize>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| Error::ValidationFailed {
            message: format!("request body is not representable as JSON: {}", e),
            errors: Vec::new(),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn public(mut self) -> Self {
        self.use_auth = false;
        self
    }
}

/// Sort direction for cursor queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Parameters for cursor-based pagination
///
/// An absent cursor on the request means "first page"; a `None` cursor on
/// the response means "no further pages".
#[derive(Debug, Clone, Default)]
pub struct CursorQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    /// Serialized as `filter[<key>]=<value>` query entries
    pub filters: BTreeMap<String, String>,
}

impl CursorQuery {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = Some(order);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Flatten into query pairs using the wire conventions
    /// (`limit`, `cursor`, `sortBy`, `sortOrder`, `filter[<key>]`).
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor".to_string(), cursor.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sortBy".to_string(), sort_by.clone()));
        }
        if let Some(sort_order) = self.sort_order {
            pairs.push(("sortOrder".to_string(), sort_order.as_str().to_string()));
        }
        for (key, value) in &self.filters {
            pairs.push((format!("filter[{}]", key), value.clone()));
        }
        pairs
    }
}

/// One page of a cursor-paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub data: Vec<T>,
    /// Opaque continuation token; `None` signals the terminal page
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

/// One page of an offset-paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub has_more: bool,
}

/// One request in a batch fan-out
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub endpoint: String,
    pub options: RequestOptions,
}

impl BatchRequest {
    pub fn new(endpoint: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            endpoint: endpoint.into(),
            options,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, RequestOptions::default())
    }
}

/// Per-request outcome of a batch fan-out; the aggregate call never fails
#[derive(Debug)]
pub struct BatchOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<Error>,
}

impl BatchOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutating_methods() {
        assert!(!Method::Get.is_mutating());
        assert!(Method::Post.is_mutating());
        assert!(Method::Put.is_mutating());
        assert!(Method::Patch.is_mutating());
        assert!(Method::Delete.is_mutating());
    }

    #[test]
    fn test_cursor_query_pairs() {
        let query = CursorQuery::default()
            .with_limit(20)
            .with_cursor("abc")
            .with_sort("createdAt", SortOrder::Desc)
            .with_filter("status", "vacant")
            .with_filter("building", "north");

        let pairs = query.to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("limit".to_string(), "20".to_string()),
                ("cursor".to_string(), "abc".to_string()),
                ("sortBy".to_string(), "createdAt".to_string()),
                ("sortOrder".to_string(), "desc".to_string()),
                ("filter[building]".to_string(), "north".to_string()),
                ("filter[status]".to_string(), "vacant".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_cursor_query_has_no_pairs() {
        assert!(CursorQuery::default().to_query_pairs().is_empty());
    }

    #[test]
    fn test_cursor_page_deserializes_without_optional_fields() {
        let page: CursorPage<Value> =
            serde_json::from_str(r#"{"data": [1, 2, 3]}"#).unwrap();
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.cursor, None);
        assert!(!page.has_more);
        assert_eq!(page.total_count, None);
    }

    #[test]
    fn test_json_body_round_trip() {
        #[derive(Serialize)]
        struct Lease {
            unit: String,
            rent: u32,
        }

        let options = RequestOptions::new(Method::Post)
            .with_json_body(&Lease {
                unit: "4B".to_string(),
                rent: 1850,
            })
            .unwrap();
        assert_eq!(
            options.body,
            Some(serde_json::json!({"unit": "4B", "rent": 1850}))
        );
    }
}
