//! In-memory transport with per-prompt scripted replies.

use ai_batch_rust::transport::{Transport, TransportError};
use ai_batch_rust::types::{Completion, Usage};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub type Reply = Result<Completion, TransportError>;

type Hook = Box<dyn Fn(&str) + Send + Sync>;

/// Replies from a per-prompt queue; prompts without a script (or with an
/// exhausted one) succeed by echoing the prompt as JSON.
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    delay: Duration,
    usage: Usage,
    calls: Mutex<Vec<(String, Instant)>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    on_call: Option<Hook>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            usage: Usage::new(100, 25),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            on_call: None,
        }
    }

    /// Simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Usage::new(prompt_tokens, completion_tokens);
        self
    }

    /// Replies for successive calls with `prompt`.
    pub fn script(self, prompt: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(prompt.to_string(), replies.into());
        self
    }

    /// Runs synchronously at the start of every call.
    pub fn on_call(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Box::new(hook));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, prompt: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == prompt)
            .count()
    }

    /// Start instants of every call, in call order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, prompt: &str, _system_message: &str) -> Reply {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), Instant::now()));
        if let Some(hook) = &self.on_call {
            hook(prompt);
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(prompt)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| {
            Ok(Completion {
                content: serde_json::json!({ "echo": prompt }).to_string(),
                usage: self.usage,
            })
        })
    }
}

pub fn ok(content: &str, prompt_tokens: u64, completion_tokens: u64) -> Reply {
    Ok(Completion {
        content: content.to_string(),
        usage: Usage::new(prompt_tokens, completion_tokens),
    })
}

pub fn connection_error() -> Reply {
    Err(TransportError::Connection("connection reset by peer".to_string()))
}

pub fn rate_limited() -> Reply {
    Err(TransportError::Protocol {
        status: Some(429),
        message: "Rate limit reached for requests".to_string(),
        error_type: Some("requests".to_string()),
        code: Some("rate_limit_exceeded".to_string()),
    })
}
