//! Batch runs through the processor with a scripted transport

use crate::scripted::{connection_error, ok, rate_limited, ScriptedTransport};
use crate::{processor, test_config};
use ai_batch_rust::batch::{FailureKind, ResultSummary};
use ai_batch_rust::transport::TransportError;
use ai_batch_rust::{Error, ItemFailure};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Review {
    id: u32,
    text: String,
}

fn reviews(n: u32) -> Vec<Review> {
    (0..n)
        .map(|id| Review {
            id,
            text: format!("review number {}", id),
        })
        .collect()
}

fn render(r: &Review) -> String {
    format!("classify #{}: {}", r.id, r.text)
}

#[tokio::test(start_paused = true)]
async fn test_all_items_succeed_first_try() {
    let transport = Arc::new(ScriptedTransport::new());
    let p = processor(test_config(), &transport);

    let outcomes = p.process_batch("2024-W05", reviews(3), render).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.is_success() && o.retries == 0));
    let summary = ResultSummary::from_outcomes(&outcomes);
    assert_eq!(summary.success_count, 3);
    assert_eq!(summary.success_rate, 1.0);
    assert_eq!(summary.total_retries, 0);
    assert!(p.report(&outcomes).contains("success_rate=100.00%"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_then_success() {
    let transport = Arc::new(ScriptedTransport::new().script(
        "classify #0: review number 0",
        vec![connection_error(), connection_error(), ok("{\"label\":\"positive\"}", 40, 6)],
    ));
    let p = processor(test_config(), &transport);

    let outcomes = p.process_batch("w", reviews(1), render).await.unwrap();

    let o = &outcomes[0];
    assert!(o.is_success());
    assert_eq!(o.retries, 2);
    assert_eq!(o.output(), Some("{\"label\":\"positive\"}"));
    // backoff 1s then 2s is part of the item's duration
    assert!(o.duration >= Duration::from_secs(3));
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_keeps_last_error() {
    let prompt = "classify #0: review number 0";
    let transport = Arc::new(ScriptedTransport::new().script(
        prompt,
        vec![connection_error(), connection_error(), rate_limited(), ok("never", 1, 1)],
    ));
    let mut config = test_config();
    config.retry.max_retries = 2;
    let p = processor(config, &transport);

    let outcomes = p.process_batch("w", reviews(1), render).await.unwrap();

    let o = &outcomes[0];
    assert!(!o.is_success());
    assert_eq!(o.retries, 2);
    assert_eq!(transport.calls_for(prompt), 3);
    match o.error() {
        Some(ItemFailure::RetryExhausted { attempts, last }) => {
            assert_eq!(*attempts, 3);
            assert_eq!(last.status(), Some(429));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(
        o.error().and_then(ItemFailure::last_error_kind),
        Some(FailureKind::Protocol)
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_render_is_validation_failure() {
    let transport = Arc::new(ScriptedTransport::new());
    let p = processor(test_config(), &transport);
    let before = p.signals().rate_limiter.available;

    let outcomes = p
        .process_batch("w", reviews(4), |r: &Review| {
            if r.id == 2 {
                String::new()
            } else {
                render(r)
            }
        })
        .await
        .unwrap();

    assert_eq!(outcomes[2].error(), Some(&ItemFailure::empty_prompt()));
    assert_eq!(outcomes[2].retries, 0);
    assert_eq!(transport.call_count(), 3);
    assert_eq!(before - p.signals().rate_limiter.available, 3);
    assert!(outcomes[0].is_success() && outcomes[1].is_success() && outcomes[3].is_success());
}

#[tokio::test(start_paused = true)]
async fn test_outcomes_are_index_aligned_with_mixed_results() {
    let mut transport = ScriptedTransport::new().with_delay(Duration::from_millis(30));
    for id in [1u32, 4, 7] {
        transport = transport.script(
            &format!("classify #{}: review number {}", id, id),
            vec![Err(TransportError::Decode("unexpected EOF".into())); 8],
        );
    }
    let transport = Arc::new(transport);
    let mut config = test_config();
    config.batch.size = 4;
    config.batch.max_concurrent = 3;
    config.retry.max_retries = 1;
    let p = processor(config, &transport);

    let outcomes = p.process_batch("w", reviews(10), render).await.unwrap();

    assert_eq!(outcomes.len(), 10);
    for (i, o) in outcomes.iter().enumerate() {
        assert_eq!(o.index, i);
        let expect_failure = [1, 4, 7].contains(&i);
        assert_eq!(o.is_success(), !expect_failure, "item {}", i);
        if !expect_failure {
            let expected = serde_json::json!({ "echo": format!("classify #{}: review number {}", i, i) });
            assert_eq!(o.output(), Some(expected.to_string().as_str()));
        }
        assert!(o.retries <= 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_cap_holds_within_batch() {
    let transport = Arc::new(ScriptedTransport::new().with_delay(Duration::from_millis(100)));
    let mut config = test_config();
    config.batch.size = 20;
    config.batch.max_concurrent = 4;
    let p = processor(config, &transport);

    let outcomes = p.process_batch("w", reviews(20), render).await.unwrap();

    assert!(outcomes.iter().all(|o| o.is_success()));
    assert_eq!(transport.peak_concurrency(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_share_one_pool() {
    let transport = Arc::new(ScriptedTransport::new().with_delay(Duration::from_millis(100)));
    let mut config = test_config();
    config.batch.size = 10;
    config.batch.max_concurrent = 3;
    let p = processor(config, &transport);

    let (a, b) = tokio::join!(
        p.process_batch("a", reviews(6), render),
        p.process_batch("b", reviews(6), render)
    );

    assert_eq!(a.unwrap().len(), 6);
    assert_eq!(b.unwrap().len(), 6);
    assert_eq!(transport.peak_concurrency(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_batches_do_not_overlap() {
    let transport = Arc::new(ScriptedTransport::new().with_delay(Duration::from_millis(100)));
    let mut config = test_config();
    config.batch.size = 3;
    config.batch.max_concurrent = 10;
    let p = processor(config, &transport);
    let start = tokio::time::Instant::now();

    p.process_batch("w", reviews(7), render).await.unwrap();

    // batch number each call started in, by 100ms slot
    let slots: Vec<u128> = transport
        .call_times()
        .iter()
        .map(|t| t.duration_since(start).as_millis() / 100)
        .collect();
    assert_eq!(slots, vec![0, 0, 0, 1, 1, 1, 2]);
    assert_eq!(transport.peak_concurrency(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_usage_recorded_only_for_successes() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_usage(200, 50)
            .script("classify #1: review number 1", vec![connection_error(); 4]),
    );
    let mut config = test_config();
    config.retry.max_retries = 3;
    let p = processor(config, &transport);

    let outcomes = p.process_batch("2024-W06", reviews(3), render).await.unwrap();

    assert!(!outcomes[1].is_success());
    let tracker = p.usage_tracker().unwrap();
    let week = tracker.summary("2024-W06");
    assert_eq!(week.requests, 2);
    assert_eq!(week.total_tokens, 500);
    assert_eq!(tracker.total_summary().total_tokens, 500);
    assert!(p.usage_report().unwrap().contains("2024-W06 (2 requests)"));
}

#[tokio::test(start_paused = true)]
async fn test_process_from_loader() {
    let transport = Arc::new(ScriptedTransport::new());
    let p = processor(test_config(), &transport);

    let outcomes = p
        .process_from("w", || async { Ok(reviews(5)) }, render)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 5);
    assert_eq!(transport.call_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_process_from_loader_failure_aborts_run() {
    let transport = Arc::new(ScriptedTransport::new());
    let p = processor(test_config(), &transport);

    let result = p
        .process_from(
            "w",
            || async {
                Err::<Vec<Review>, _>(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "reviews table unavailable",
                )))
            },
            render,
        )
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Runtime { .. }));
    let context = err.context().unwrap();
    assert_eq!(context.source.as_deref(), Some("item_source"));
    assert!(context
        .details
        .as_deref()
        .unwrap()
        .contains("reviews table unavailable"));
    assert_eq!(transport.call_count(), 0);
}
