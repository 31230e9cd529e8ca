//! Mock HTTP server setup for integration tests

use ai_batch_rust::ProcessorConfig;
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = format!("{}/v1", server.url());
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Processor configuration pointed at the mock server with fast retries.
    pub fn config(&self) -> ProcessorConfig {
        let mut config = ProcessorConfig::default();
        config.model.name = "gpt-4o-mini".to_string();
        config.model.base_url = self.base_url.clone();
        config.model.api_key = Some("test-key".to_string());
        config.model.timeout_ms = 5_000;
        config.rate_limit.requests_per_minute = 600;
        config.retry.initial_delay_ms = 10;
        config.retry.max_delay_ms = 40;
        config
    }

    /// Successful completion whose content is `content`.
    pub async fn mock_completion(&self, content: &str, prompt_tokens: u64, completion_tokens: u64) -> Mock {
        let body = serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": prompt_tokens,
                "completion_tokens": completion_tokens,
                "total_tokens": prompt_tokens + completion_tokens
            }
        });
        self.mock_json_response(200, &body.to_string()).await
    }

    /// Successful completion only for requests whose user message contains `needle`.
    pub async fn mock_completion_for(&self, needle: &str, content: &str) -> Mock {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        });
        let mut server = self.server.lock().await;
        server
            .mock("POST", COMPLETIONS_PATH)
            .match_body(Matcher::Regex(regex_escape(needle)))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Create a mock for a JSON response
    pub async fn mock_json_response(&self, status: u16, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", COMPLETIONS_PATH)
            .with_status(status as usize)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Error response served for the next `times` matching requests before
    /// later mocks take over.
    pub async fn mock_error_response(&self, status: u16, error_body: &str, times: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", COMPLETIONS_PATH)
            .with_status(status as usize)
            .with_header("content-type", "application/json")
            .with_body(error_body)
            .expect(times)
            .create_async()
            .await
    }
}

fn regex_escape(s: &str) -> String {
    s.chars()
        .flat_map(|c| {
            if "\\.+*?()|[]{}^$".contains(c) {
                vec!['\\', c]
            } else {
                vec![c]
            }
        })
        .collect()
}
