//! Concurrent fan-out of independent requests
//!
//! All-settle semantics: every request runs to completion, one failure never
//! aborts or delays the others, and the aggregate call itself never fails.
//! Outcomes come back in input order.

use futures_util::future::join_all;

use crate::http::client::ApiClient;
use crate::types::{BatchOutcome, BatchRequest};

impl ApiClient {
    /// Execute independent requests concurrently, returning a same-length,
    /// same-order sequence of per-request outcomes.
    pub async fn batch(&self, requests: Vec<BatchRequest>) -> Vec<BatchOutcome> {
        let futures = requests.into_iter().map(|request| async move {
            match self
                .execute_value(&request.endpoint, request.options)
                .await
            {
                Ok(data) => BatchOutcome::ok(data),
                Err(error) => BatchOutcome::failed(error),
            }
        });
        join_all(futures).await
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

    fn client(transport: Arc<MockTransport>) -> ApiClient {
        ApiClient::with_transport(
            test_config(),
            Arc::new(StubSession::with_token("tok")),
            Arc::new(StaticCsrfToken::new("csrf")),
            transport,
        )
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, r#"{"id": 1}"#);
        transport.push_response(500, r#"{"message": "boom"}"#);
        transport.push_response(200, r#"{"id": 3}"#);
        let client = client(transport);

        let outcomes = client
            .batch(vec![
                BatchRequest::get("/units/1"),
                BatchRequest::get("/units/2"),
                BatchRequest::get("/units/3"),
            ])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].data, Some(json!({"id": 1})));
        assert!(!outcomes[1].success);
        assert_eq!(
            outcomes[1].error.as_ref().unwrap().kind(),
            ErrorKind::ServerError
        );
        assert!(outcomes[2].success);
        assert_eq!(outcomes[2].data, Some(json!({"id": 3})));
    }

    #[tokio::test]
    async fn test_empty_batch_resolves_empty() {
        let transport = Arc::new(MockTransport::new());
        let client = client(transport.clone());

        let outcomes = client.batch(Vec::new()).await;
        assert!(outcomes.is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_batch_failure_carries_classification_not_panic() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(404, r#"{"message": "no such unit"}"#);
        let client = client(transport);

        let outcomes = client.batch(vec![BatchRequest::get("/units/404")]).await;
        let error = outcomes[0].error.as_ref().unwrap();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.message(), "no such unit");
    }
}
