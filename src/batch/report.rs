//! Run summaries and the fixed-width results table.

use super::outcome::{FailureKind, Outcome};
use crate::utils::{single_line, truncate};
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::info;

const DEFAULT_TABLE_WIDTH: usize = 150;
const ERROR_COLUMN_CHARS: usize = 28;
const SUMMARY_BOX_WIDTH: usize = 78;

/// Aggregate statistics over a run's outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub total_items: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub validation_count: usize,
    pub cancelled_count: usize,
    pub exhausted_count: usize,
    pub total_retries: u64,
    /// Tokens of successful items only.
    pub total_tokens: u64,
    /// Sum of per-item durations; exceeds wall time when items overlap.
    pub total_duration: Duration,
    pub average_duration: Duration,
    /// Fraction in `0.0..=1.0`.
    pub success_rate: f64,
    pub avg_tokens_per_item: u64,
}

impl ResultSummary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut s = ResultSummary {
            total_items: outcomes.len(),
            success_count: 0,
            failure_count: 0,
            validation_count: 0,
            cancelled_count: 0,
            exhausted_count: 0,
            total_retries: 0,
            total_tokens: 0,
            total_duration: Duration::ZERO,
            average_duration: Duration::ZERO,
            success_rate: 0.0,
            avg_tokens_per_item: 0,
        };

        for o in outcomes {
            match &o.result {
                Ok(c) => {
                    s.success_count += 1;
                    s.total_tokens += c.usage.total_tokens;
                }
                Err(f) => {
                    s.failure_count += 1;
                    match f.kind() {
                        FailureKind::Validation => s.validation_count += 1,
                        FailureKind::Cancelled => s.cancelled_count += 1,
                        _ => s.exhausted_count += 1,
                    }
                }
            }
            s.total_retries += u64::from(o.retries);
            s.total_duration += o.duration;
        }

        if s.total_items > 0 {
            s.average_duration =
                Duration::from_secs_f64(s.total_duration.as_secs_f64() / s.total_items as f64);
            s.success_rate = s.success_count as f64 / s.total_items as f64;
        }
        if s.success_count > 0 {
            s.avg_tokens_per_item = s.total_tokens / s.success_count as u64;
        }
        s
    }
}

/// Formats outcomes as a summary block followed by a per-item table.
#[derive(Debug, Clone)]
pub struct ResultReporter {
    table_width: usize,
}

impl Default for ResultReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultReporter {
    pub fn new() -> Self {
        Self {
            table_width: DEFAULT_TABLE_WIDTH,
        }
    }

    pub fn with_table_width(mut self, width: usize) -> Self {
        self.table_width = width;
        self
    }

    pub fn summarize(&self, outcomes: &[Outcome]) -> ResultSummary {
        ResultSummary::from_outcomes(outcomes)
    }

    /// Full results report as text, one line per table row.
    pub fn render(&self, outcomes: &[Outcome]) -> String {
        let mut out = String::new();
        if outcomes.is_empty() {
            out.push_str("No results to format\n");
            return out;
        }

        let s = self.summarize(outcomes);
        let _ = writeln!(out, "{}", self.rule('='));
        let _ = writeln!(out, "{}", self.centered("AI PROCESSING RESULTS SUMMARY"));
        let _ = writeln!(out, "{}", self.rule('='));
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Processing Statistics: total_items={} successful={} failed={} success_rate={:.2}%",
            s.total_items,
            s.success_count,
            s.failure_count,
            s.success_rate * 100.0
        );
        let _ = writeln!(
            out,
            "Performance Metrics: total_duration={:?} average_per_item={:?} total_retries={}",
            round_ms(s.total_duration),
            round_ms(s.average_duration),
            s.total_retries
        );
        if s.total_tokens > 0 {
            let _ = writeln!(
                out,
                "Token Usage: total_tokens={} avg_tokens_per_item={}",
                s.total_tokens, s.avg_tokens_per_item
            );
        }
        if s.failure_count > 0 {
            let _ = writeln!(
                out,
                "Failures: validation={} cancelled={} retry_exhausted={}",
                s.validation_count, s.cancelled_count, s.exhausted_count
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.rule('-'));
        let _ = writeln!(out, "{}", self.centered("DETAILED RESULTS"));
        let _ = writeln!(out, "{}", self.rule('-'));
        let _ = writeln!(
            out,
            "{:<6} | {:<10} | {:<8} | {:<10} | {:<10} | {:<30}",
            "Index", "Status", "Retries", "Duration", "Tokens", "Error"
        );
        let _ = writeln!(out, "{}", self.rule('-'));

        for o in outcomes {
            let (status, tokens, error) = match &o.result {
                Ok(c) => ("SUCCESS", c.usage.total_tokens.to_string(), "-".to_string()),
                Err(f) if f.is_cancelled() => ("CANCELLED", "-".to_string(), f.to_string()),
                Err(f) => (
                    "FAILED",
                    "-".to_string(),
                    truncate(&single_line(&f.to_string()), ERROR_COLUMN_CHARS),
                ),
            };
            let _ = writeln!(
                out,
                "{:<6} | {:<10} | {:<8} | {:<10} | {:<10} | {:<30}",
                o.index,
                status,
                o.retries,
                format!("{:?}", round_ms(o.duration)),
                tokens,
                error
            );
        }
        let _ = writeln!(out, "{}", self.rule('='));
        out
    }

    /// Emit [`render`](Self::render) line by line at info level.
    pub fn log_results(&self, outcomes: &[Outcome]) {
        for line in self.render(outcomes).lines() {
            info!("{}", line);
        }
    }

    /// Boxed one-line total/success/failed summary.
    pub fn final_summary(&self, total: usize, success: usize, failed: usize) -> String {
        let rate = if total > 0 {
            success as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let bar = "═".repeat(SUMMARY_BOX_WIDTH);
        let stats = format!(
            "Total: {:<3}  |  Success: {:<3}  |  Failed: {:<3}  |  Success Rate: {:6.2}%",
            total, success, failed, rate
        );

        let mut out = String::new();
        let _ = writeln!(out, "╔{}╗", bar);
        let _ = writeln!(out, "║{}║", center_text("FINAL PROCESSING SUMMARY", SUMMARY_BOX_WIDTH));
        let _ = writeln!(out, "╠{}╣", bar);
        let _ = writeln!(out, "║{}║", center_text(&stats, SUMMARY_BOX_WIDTH));
        let _ = writeln!(out, "╚{}╝", bar);
        out
    }

    pub fn log_final_summary(&self, total: usize, success: usize, failed: usize) {
        for line in self.final_summary(total, success, failed).lines() {
            info!("{}", line);
        }
    }

    fn rule(&self, c: char) -> String {
        std::iter::repeat(c).take(self.table_width).collect()
    }

    fn centered(&self, text: &str) -> String {
        let pad = self.table_width.saturating_sub(text.chars().count()) / 2;
        format!("{}{}", " ".repeat(pad), text)
    }
}

fn center_text(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }
    let left = (width - len) / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(width - len - left))
}

fn round_ms(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
