use super::{Transport, TransportError};
use crate::config::ModelConfig;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, Completion};
use crate::utils::truncate;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::Proxy;
use std::env;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const MAX_BODY_IN_ERROR: usize = 500;

/// reqwest-backed chat-completion transport.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f64>,
    max_completion_tokens: Option<u32>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let timeout = config.timeout();

        let mut builder = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .pool_max_idle_per_host(
                env::var("AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("AI_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                format!("failed to build HTTP client: {}", e),
                ErrorContext::new().with_source("http_transport"),
            )
        })?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                CHAT_COMPLETIONS_PATH
            ),
            model: config.name.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_completion_tokens: config.max_completion_tokens,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(
        &self,
        body: &ChatCompletionRequest,
        request_id: &str,
    ) -> std::result::Result<Completion, TransportError> {
        let mut req = self
            .client
            .post(&self.endpoint)
            .json(body)
            .header("x-request-id", request_id);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| self.classify(e))?;
        decode_response(status, &text)
    }

    fn classify(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Connection(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        prompt: &str,
        system_message: &str,
    ) -> std::result::Result<Completion, TransportError> {
        let request_id = Uuid::new_v4().to_string();
        let body = ChatCompletionRequest::new(&self.model, system_message, prompt)
            .with_temperature(self.temperature)
            .with_max_completion_tokens(self.max_completion_tokens);

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.send(&body, &request_id)).await
        {
            Ok(r) => r,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };

        debug!(
            request_id = request_id.as_str(),
            model = self.model.as_str(),
            ok = result.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "chat completion call finished"
        );
        result
    }
}

/// Decode a chat-completion HTTP response into a [`Completion`] or a classified failure.
///
/// - non-2xx status: protocol failure, message taken from the `error` object when present
/// - unparsable 2xx body: decode failure
/// - 2xx body carrying a non-empty `error` object: protocol failure
/// - no `choices[0].message.content`: decode failure
pub fn decode_response(
    status: u16,
    body: &str,
) -> std::result::Result<Completion, TransportError> {
    let parsed = serde_json::from_str::<ChatCompletionResponse>(body);

    if !(200..300).contains(&status) {
        let api_error = parsed.ok().and_then(|r| r.error).filter(|e| !e.is_empty());
        return Err(match api_error {
            Some(e) => TransportError::Protocol {
                status: Some(status),
                message: e.message.clone(),
                code: e.code_string(),
                error_type: e.error_type,
            },
            None => TransportError::Protocol {
                status: Some(status),
                message: truncate(body, MAX_BODY_IN_ERROR),
                error_type: None,
                code: None,
            },
        });
    }

    let resp = parsed.map_err(|e| TransportError::Decode(e.to_string()))?;

    if let Some(e) = resp.error.filter(|e| !e.is_empty()) {
        return Err(TransportError::Protocol {
            status: Some(status),
            message: e.message.clone(),
            code: e.code_string(),
            error_type: e.error_type,
        });
    }

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Decode("no choices in response".to_string()))?;
    let content = choice
        .message
        .content
        .ok_or_else(|| TransportError::Decode("choice has no message content".to_string()))?;

    let mut usage = resp.usage;
    if usage.total_tokens == 0 {
        usage.total_tokens = usage.prompt_tokens + usage.completion_tokens;
    }

    Ok(Completion { content, usage })
}
