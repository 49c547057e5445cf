//! Page- and cursor-based query helpers layered on the request executor
//!
//! All envelope variation ("is it already an array or wrapped in `{data}` /
//! `{items}`?") is absorbed here in one place; callers only ever see
//! `PageResult<T>` and `CursorPage<T>`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http::cache::cache_key;
use crate::http::client::ApiClient;
use crate::types::{CursorPage, CursorQuery, Method, PageResult, RequestOptions};

impl ApiClient {
    /// Offset-paginated request, appending `page` and `pageSize` query
    /// parameters. Never cached.
    pub async fn paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: u32,
        page_size: u32,
        mut options: RequestOptions,
    ) -> Result<PageResult<T>> {
        options.query.push(("page".to_string(), page.to_string()));
        options
            .query
            .push(("pageSize".to_string(), page_size.to_string()));

        let value = self.execute_value(endpoint, options).await?;
        normalize_page_result(value)
    }

    /// Cursor-paginated request. An absent cursor in `query` asks for the
    /// first page; a `None` cursor on the returned page means there is
    /// nothing further to fetch.
    pub async fn cursor_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &CursorQuery,
        mut options: RequestOptions,
    ) -> Result<CursorPage<T>> {
        options.query.extend(query.to_query_pairs());
        let value = self.execute_value(endpoint, options).await?;
        normalize_cursor_page(value)
    }

    /// Cursor-paginated request with an opt-in read-through cache.
    ///
    /// Only GET requests ever consult or populate the cache, and population
    /// happens only after a successful fetch. An unserializable key silently
    /// bypasses the cache; the request itself still runs.
    pub async fn cached_cursor_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &CursorQuery,
        mut options: RequestOptions,
        use_cache: bool,
    ) -> Result<CursorPage<T>> {
        let pairs = query.to_query_pairs();
        let key = if use_cache && options.method == Method::Get {
            let params: BTreeMap<&str, &str> = pairs
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            cache_key(endpoint, &params)
        } else {
            None
        };

        if let Some(key) = &key {
            if let Some(cached) = self.cache().get(key) {
                debug!(endpoint, "serving cursor page from cache");
                return normalize_cursor_page(cached);
            }
        }

        options.query.extend(pairs);
        let value = self.execute_value(endpoint, options).await?;

        if let Some(key) = key {
            self.cache().insert(key, value.clone());
        }

        normalize_cursor_page(value)
    }
}

/// Normalize the cursor-page envelope: either `{data, cursor, hasMore,
/// totalCount}` or a raw array (terminal single page).
pub fn normalize_cursor_page<T: DeserializeOwned>(value: Value) -> Result<CursorPage<T>> {
    let shape_error = |e: serde_json::Error| Error::Unknown {
        message: format!("cursor page did not match the expected shape: {}", e),
        status: None,
    };

    match value {
        Value::Array(items) => Ok(CursorPage {
            data: serde_json::from_value(Value::Array(items)).map_err(shape_error)?,
            cursor: None,
            has_more: false,
            total_count: None,
        }),
        Value::Object(ref map) if map.contains_key("data") => {
            let cursor = map
                .get("cursor")
                .and_then(|c| c.as_str())
                .map(|s| s.to_string());
            let has_more = map
                .get("hasMore")
                .and_then(|h| h.as_bool())
                .unwrap_or(cursor.is_some());
            let total_count = map.get("totalCount").and_then(|t| t.as_u64());
            let data =
                serde_json::from_value(map["data"].clone()).map_err(shape_error)?;
            Ok(CursorPage {
                data,
                cursor,
                has_more,
                total_count,
            })
        }
        Value::Object(ref map) if map.contains_key("items") => {
            // Offset envelope returned by an endpoint we paged by cursor;
            // fold it into the cursor contract as a terminal page.
            let data =
                serde_json::from_value(map["items"].clone()).map_err(shape_error)?;
            Ok(CursorPage {
                data,
                cursor: None,
                has_more: map
                    .get("hasMore")
                    .and_then(|h| h.as_bool())
                    .unwrap_or(false),
                total_count: map.get("total").and_then(|t| t.as_u64()),
            })
        }
        other => Err(Error::Unknown {
            message: format!(
                "unrecognized cursor page envelope: {}",
                summarize(&other)
            ),
            status: None,
        }),
    }
}

/// Normalize the offset-page envelope: `{items, total, hasMore}` or a raw
/// array.
pub fn normalize_page_result<T: DeserializeOwned>(value: Value) -> Result<PageResult<T>> {
    let shape_error = |e: serde_json::Error| Error::Unknown {
        message: format!("page result did not match the expected shape: {}", e),
        status: None,
    };

    match value {
        Value::Array(items) => {
            let items: Vec<T> =
                serde_json::from_value(Value::Array(items)).map_err(shape_error)?;
            let total = items.len() as u64;
            Ok(PageResult {
                items,
                total,
                has_more: false,
            })
        }
        Value::Object(_) => serde_json::from_value(value).map_err(shape_error),
        other => Err(Error::Unknown {
            message: format!("unrecognized page envelope: {}", summarize(&other)),
            status: None,
        }),
    }
}

fn summarize(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
