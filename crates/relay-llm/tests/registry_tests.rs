#[cfg(test)]
mod tests {
    use relay_core::{Message, RelayError, Role};
    use relay_llm::mock::{MockProvider, MockResponse};
    use relay_llm::provider::ChatRequest;
    use relay_llm::registry::ProviderRegistry;
    use std::sync::Arc;

    fn make_request(model: &str) -> ChatRequest {
        ChatRequest::new(model, vec![Message::text(Role::User, "Hello")])
    }

    // ── Registry resolve / complete ────────────────────────────

    #[tokio::test]
    async fn test_complete_via_registry() {
        let mock = MockProvider::new().with_response("Hello from mock!");
        let mut registry = ProviderRegistry::new();
        registry.insert("main", Arc::new(mock));

        let resp = registry
            .complete("main", &make_request("some-model"))
            .await
            .unwrap();
        assert_eq!(resp.message.text_content(), "Hello from mock!");
    }

    #[tokio::test]
    async fn test_unknown_provider_id() {
        let registry = ProviderRegistry::new();
        let result = registry.complete("nonexistent", &make_request("m")).await;
        assert!(matches!(
            result.unwrap_err(),
            RelayError::ProviderNotConfigured(_)
        ));
    }

    // ── Retry logic ────────────────────────────────────────────

    #[tokio::test]
    async fn test_retry_on_transient_error() {
        // First call fails with retryable error, second succeeds
        let mock = MockProvider::new()
            .with_error(429, "rate limited")
            .with_mock_response(MockResponse::text("success after retry"));

        let mut registry = ProviderRegistry::new();
        registry.insert("main", Arc::new(mock));

        let resp = registry.complete("main", &make_request("m")).await.unwrap();
        assert_eq!(resp.message.text_content(), "success after retry");
    }

    #[tokio::test]
    async fn test_no_retry_on_client_error() {
        let mock = MockProvider::new()
            .with_error(400, "bad request")
            .with_response("should never be reached");

        let mut registry = ProviderRegistry::new();
        registry.insert("main", Arc::new(mock));

        let result = registry.complete("main", &make_request("m")).await;
        assert!(matches!(
            result.unwrap_err(),
            RelayError::Provider { status: 400, .. }
        ));
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let mock = MockProvider::new()
            .with_error(503, "overloaded")
            .with_error(503, "overloaded")
            .with_error(503, "overloaded")
            .with_error(503, "still overloaded");

        let mut registry = ProviderRegistry::new();
        registry.insert("main", Arc::new(mock));

        let result = registry.complete("main", &make_request("m")).await;
        match result.unwrap_err() {
            RelayError::Provider { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "still overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ── Request recording ──────────────────────────────────────

    #[tokio::test]
    async fn test_request_recording() {
        let mock = MockProvider::new().with_response("ok");
        let requests = mock.recorded_requests();

        let mut registry = ProviderRegistry::new();
        registry.insert("recorder", Arc::new(mock));

        registry
            .complete("recorder", &make_request("m"))
            .await
            .unwrap();

        let recorded = requests.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].messages[0].text_content(), "Hello");
    }
}
