//! Thread-safe token usage and cost accounting.

use super::pricing::ModelPricing;
use crate::types::Usage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{PoisonError, RwLock};

/// Accounting entry for one successful call. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub timestamp: DateTime<Utc>,
}

/// Fold of any number of [`UsageRecord`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
}

impl UsageTotals {
    fn add(&mut self, record: &UsageRecord) {
        self.requests += 1;
        self.prompt_tokens += record.prompt_tokens;
        self.completion_tokens += record.completion_tokens;
        self.total_tokens += record.total_tokens;
        self.estimated_cost += record.estimated_cost;
    }
}

#[derive(Debug, Default)]
struct Ledger {
    by_label: BTreeMap<String, Vec<UsageRecord>>,
    total: UsageTotals,
}

/// Token/cost ledger keyed by a caller-chosen label (e.g. a processing week).
///
/// Explicitly constructed and shared by `Arc`; it outlives individual batch
/// runs so usage across several runs can be reported together. Never affects
/// control flow.
#[derive(Debug)]
pub struct UsageTracker {
    pricing: ModelPricing,
    ledger: RwLock<Ledger>,
}

impl UsageTracker {
    /// Tracker priced for `model`; unknown models use the default tier.
    pub fn new(model: &str) -> Self {
        Self::with_pricing(ModelPricing::for_model_or_default(model))
    }

    pub fn with_pricing(pricing: ModelPricing) -> Self {
        Self {
            pricing,
            ledger: RwLock::new(Ledger::default()),
        }
    }

    pub fn pricing(&self) -> &ModelPricing {
        &self.pricing
    }

    /// Append a record under `label` and fold it into the grand total.
    pub fn record(&self, label: &str, prompt_tokens: u64, completion_tokens: u64) -> UsageRecord {
        let record = UsageRecord {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            estimated_cost: self.pricing.cost(prompt_tokens, completion_tokens),
            timestamp: Utc::now(),
        };

        let mut ledger = self.ledger.write().unwrap_or_else(PoisonError::into_inner);
        ledger
            .by_label
            .entry(label.to_string())
            .or_default()
            .push(record.clone());
        ledger.total.add(&record);
        record
    }

    pub fn record_usage(&self, label: &str, usage: &Usage) -> UsageRecord {
        self.record(label, usage.prompt_tokens, usage.completion_tokens)
    }

    /// Totals for one label; zero if the label was never recorded.
    pub fn summary(&self, label: &str) -> UsageTotals {
        let ledger = self.ledger.read().unwrap_or_else(PoisonError::into_inner);
        fold(ledger.by_label.get(label).map(Vec::as_slice).unwrap_or(&[]))
    }

    pub fn total_summary(&self) -> UsageTotals {
        self.ledger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .total
    }

    /// Records under `label`, in the order they were recorded.
    pub fn records(&self, label: &str) -> Vec<UsageRecord> {
        let ledger = self.ledger.read().unwrap_or_else(PoisonError::into_inner);
        ledger.by_label.get(label).cloned().unwrap_or_default()
    }

    pub fn labels(&self) -> Vec<String> {
        let ledger = self.ledger.read().unwrap_or_else(PoisonError::into_inner);
        ledger.by_label.keys().cloned().collect()
    }

    /// Human-readable per-label and total usage/cost report.
    pub fn report(&self) -> String {
        let ledger = self.ledger.read().unwrap_or_else(PoisonError::into_inner);
        let p = &self.pricing;
        let rule = "=".repeat(80);
        let mut out = String::new();

        let _ = writeln!(out, "TOKEN USAGE & COST REPORT");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Model: {}", p.model);
        let _ = writeln!(
            out,
            "Pricing: Input ${:.2}/1M tokens | Output ${:.2}/1M tokens",
            p.input_cost_per_1m, p.output_cost_per_1m
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Per-Label Breakdown:");
        for (label, records) in &ledger.by_label {
            if records.is_empty() {
                continue;
            }
            let t = fold(records);
            let _ = writeln!(out);
            let _ = writeln!(out, "   {} ({} requests):", label, t.requests);
            let _ = writeln!(
                out,
                "      Input:  {:>7} tokens (${:.4})",
                t.prompt_tokens,
                p.input_cost(t.prompt_tokens)
            );
            let _ = writeln!(
                out,
                "      Output: {:>7} tokens (${:.4})",
                t.completion_tokens,
                p.output_cost(t.completion_tokens)
            );
            let _ = writeln!(
                out,
                "      Total:  {:>7} tokens (${:.4})",
                t.total_tokens, t.estimated_cost
            );
        }

        let t = &ledger.total;
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "TOTAL SUMMARY:");
        let _ = writeln!(
            out,
            "   Input tokens:      {:>10} (${:.4})",
            t.prompt_tokens,
            p.input_cost(t.prompt_tokens)
        );
        let _ = writeln!(
            out,
            "   Output tokens:     {:>10} (${:.4})",
            t.completion_tokens,
            p.output_cost(t.completion_tokens)
        );
        let _ = writeln!(out, "   Total tokens:      {:>10}", t.total_tokens);
        let _ = writeln!(out, "   Estimated cost:    ${:.4} {}", t.estimated_cost, p.currency);
        let _ = writeln!(out, "{}", rule);
        out
    }
}

fn fold(records: &[UsageRecord]) -> UsageTotals {
    let mut totals = UsageTotals::default();
    for r in records {
        totals.add(r);
    }
    totals
}
