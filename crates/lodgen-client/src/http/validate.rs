//! Schema-validated request wrapper
//!
//! Validates the outgoing body before dispatch and the incoming payload
//! after it, against caller-supplied schemas. The validation library itself
//! lives outside this crate; it plugs in through the `Schema` trait and
//! reports itemized, dot-pathed field errors.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, FieldError, Result};
use crate::http::client::ApiClient;
use crate::types::RequestOptions;

/// Caller-supplied schema check
///
/// On success the returned value is the *normalized* form of the input —
/// coercions and defaults applied — and is what actually goes on the wire
/// for request schemas.
pub trait Schema: Send + Sync {
    fn validate(&self, value: &Value) -> std::result::Result<Value, Vec<FieldError>>;
}

impl ApiClient {
    /// Execute a request with optional request/response schema checks.
    ///
    /// A request-schema rejection fails with `ValidationFailed` before any
    /// network call. A response-schema rejection is terminal: the caller
    /// never sees the unvalidated shape.
    pub async fn validated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        mut options: RequestOptions,
        request_schema: Option<&dyn Schema>,
        response_schema: Option<&dyn Schema>,
    ) -> Result<T> {
        if let Some(schema) = request_schema {
            let body = options.body.take().unwrap_or(Value::Null);
            let normalized = schema.validate(&body).map_err(Error::validation)?;
            debug!(endpoint, "request body passed schema validation");
            options.body = Some(normalized);
        }

        let payload = self.execute_value(endpoint, options).await?;

        let payload = match response_schema {
            Some(schema) => schema.validate(&payload).map_err(Error::validation)?,
            None => payload,
        };

        serde_json::from_value(payload).map_err(|e| Error::Unknown {
            message: format!("response did not match the expected shape: {}", e),
            status: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::http::auth::StaticCsrfToken;
    use crate::http::client::test_support::{test_config, StubSession};
    use crate::http::transport::mock::MockTransport;
    use crate::types::Method;

    fn client(transport: Arc<MockTransport>) -> ApiClient {
        ApiClient::with_transport(
            test_config(),
            Arc::new(StubSession::with_token("tok")),
            Arc::new(StaticCsrfToken::new("csrf")),
            transport,
        )
    }

    /// Schema double: requires a string `unit` field and defaults `notify`
    /// to `true` (exercising the normalized-body contract).
    struct LeaseSchema;

    impl Schema for LeaseSchema {
        fn validate(&self, value: &Value) -> std::result::Result<Value, Vec<FieldError>> {
            let mut errors = Vec::new();
            let Some(object) = value.as_object() else {
                return Err(vec![FieldError::new("", "expected an object")]);
            };
            if !object.get("unit").is_some_and(|u| u.is_string()) {
                errors.push(FieldError::new("unit", "must be a string"));
            }
            if !errors.is_empty() {
                return Err(errors);
            }
            let mut normalized = object.clone();
            normalized
                .entry("notify")
                .or_insert(Value::Bool(true));
            Ok(Value::Object(normalized))
        }
    }

    struct RejectEverything;

    impl Schema for RejectEverything {
        fn validate(&self, _value: &Value) -> std::result::Result<Value, Vec<FieldError>> {
            Err(vec![
                FieldError::new("a.b", "bad"),
                FieldError::new("c", "worse"),
            ])
        }
    }

    #[tokio::test]
    async fn test_request_schema_rejection_is_preflight() {
        let transport = Arc::new(MockTransport::new());
        let client = client(transport.clone());

        let err = client
            .validated::<Value>(
                "/leases",
                RequestOptions::new(Method::Post).with_body(json!({"unit": 4})),
                Some(&LeaseSchema),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.message(), "unit: must be a string");
        // The spy saw no network call
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_normalized_body_is_what_goes_on_the_wire() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"ok": true}"#);
        let client = client(transport.clone());

        let _: Value = client
            .validated(
                "/leases",
                RequestOptions::new(Method::Post).with_body(json!({"unit": "4B"})),
                Some(&LeaseSchema),
                None,
            )
            .await
            .unwrap();

        let sent = transport.last_request().unwrap().body.unwrap();
        assert_eq!(sent, json!({"unit": "4B", "notify": true}));
    }

    #[tokio::test]
    async fn test_response_schema_rejection_is_terminal() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"whatever": 1}"#);
        let client = client(transport.clone());

        let err = client
            .validated::<Value>("/leases", RequestOptions::default(), None, Some(&RejectEverything))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(err.message(), "a.b: bad; c: worse");
        // The request itself did run; only the payload was withheld
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_schemas_behaves_like_execute() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"id": 9}"#);
        let client = client(transport);

        let value: Value = client
            .validated("/leases/9", RequestOptions::default(), None, None)
            .await
            .unwrap();
        assert_eq!(value, json!({"id": 9}));
    }

    #[tokio::test]
    async fn test_missing_body_validates_as_null() {
        let transport = Arc::new(MockTransport::new());
        let client = client(transport.clone());

        let err = client
            .validated::<Value>(
                "/leases",
                RequestOptions::new(Method::Post),
                Some(&LeaseSchema),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert_eq!(transport.calls(), 0);
    }
}
