//! Cancellation mid-run, during backoff and before start

use crate::scripted::{connection_error, ScriptedTransport};
use crate::test_config;
use ai_batch_rust::{BatchProcessor, ItemFailure};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn prompts(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("prompt-{}", i)).collect()
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_run_preserves_completed_items() {
    let token = CancellationToken::new();
    let hook_token = token.clone();
    let transport = Arc::new(ScriptedTransport::new().on_call(move |prompt| {
        if prompt == "prompt-2" {
            hook_token.cancel();
        }
    }));
    let mut config = test_config();
    config.batch.size = 1;
    config.batch.max_concurrent = 1;
    let p = BatchProcessor::builder(config)
        .transport(transport.clone())
        .cancellation(token)
        .build()
        .unwrap();

    let outcomes = p.process_batch("w", prompts(6), |s: &String| s.clone()).await.unwrap();

    assert_eq!(outcomes.len(), 6);
    // the call that raised the signal had already been issued and completed
    for o in &outcomes[..3] {
        assert!(o.is_success(), "item {} should have succeeded", o.index);
    }
    for o in &outcomes[3..] {
        assert_eq!(o.error(), Some(&ItemFailure::Cancelled));
        assert_eq!(o.retries, 0);
    }
    assert_eq!(transport.call_count(), 3);
    assert!(p.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff() {
    let transport = Arc::new(
        ScriptedTransport::new().script("prompt-1", vec![connection_error(); 10]),
    );
    let mut config = test_config();
    config.retry.initial_delay_ms = 5_000;
    config.retry.max_delay_ms = 5_000;
    let p = crate::processor(config, &transport);

    let token = p.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        token.cancel();
    });
    let started = tokio::time::Instant::now();

    let outcomes = p.process_batch("w", prompts(3), |s: &String| s.clone()).await.unwrap();

    assert!(outcomes[0].is_success());
    assert!(outcomes[2].is_success());
    let o = &outcomes[1];
    assert_eq!(o.error(), Some(&ItemFailure::Cancelled));
    // failed at 0s and 5s, cancelled inside the second wait; both failures count
    assert_eq!(o.retries, 2);
    assert_eq!(transport.calls_for("prompt-1"), 2);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_run_makes_no_calls() {
    let transport = Arc::new(ScriptedTransport::new());
    let p = crate::processor(test_config(), &transport);
    let capacity = p.signals().rate_limiter.capacity;
    p.cancel();

    let outcomes = p.process_batch("w", prompts(25), |s: &String| s.clone()).await.unwrap();

    assert_eq!(outcomes.len(), 25);
    assert!(outcomes
        .iter()
        .all(|o| o.error().map(ItemFailure::is_cancelled) == Some(true)));
    assert_eq!(transport.call_count(), 0);
    assert_eq!(p.signals().rate_limiter.available, capacity);

    let single = p.process_single("w", "prompt", None).await;
    assert_eq!(single.error(), Some(&ItemFailure::Cancelled));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting_for_rate_limit() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut config = test_config();
    // two tokens up front, then one every 30s
    config.rate_limit.requests_per_minute = 2;
    config.batch.size = 10;
    config.batch.max_concurrent = 10;
    let p = crate::processor(config, &transport);

    let token = p.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        token.cancel();
    });

    let outcomes = p.process_batch("w", prompts(5), |s: &String| s.clone()).await.unwrap();

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let cancelled = outcomes
        .iter()
        .filter(|o| o.error() == Some(&ItemFailure::Cancelled))
        .count();
    assert_eq!(succeeded, 2);
    assert_eq!(cancelled, 3);
    assert_eq!(transport.call_count(), 2);
}
