//! Aggregate efficiency statistics derived from the traffic history.
//!
//! Nothing here is cached between changes: the runtime folds the entire
//! history after every mutation, so a replay always agrees with live state.

use serde::Serialize;
use shared::{domain::ConsensusStatus, protocol::TrafficEvent};

/// USD per saved token, at $5 per million tokens.
pub const COST_PER_TOKEN_USD: f64 = 0.000_005;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub traffic_count: usize,
    pub total_json_tokens: f64,
    pub total_slip_tokens: f64,
    pub total_saved_tokens: f64,
    pub avg_savings_pct: f64,
    pub avg_latency_ms: f64,
    pub disagreement_rate_pct: f64,
    pub avg_recovery_time_ms: f64,
    pub estimated_cost_savings_usd: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsAccumulator {
    count: usize,
    json_tokens: f64,
    slip_tokens: f64,
    latency_sum: f64,
    latency_count: usize,
    disagreement_count: usize,
    recovery_sum: f64,
    recovery_count: usize,
}

impl MetricsAccumulator {
    pub fn push(&mut self, event: &TrafficEvent) {
        self.count += 1;
        self.json_tokens += event.metrics.json_tokens;
        self.slip_tokens += event.metrics.slip_tokens;

        let Some(advanced) = &event.advanced else {
            return;
        };
        self.latency_sum += advanced.latency_ms;
        self.latency_count += 1;
        match advanced.status {
            ConsensusStatus::Disagreement => self.disagreement_count += 1,
            ConsensusStatus::Recovery => {
                self.recovery_sum += advanced.recovery_time_ms.unwrap_or(0.0);
                self.recovery_count += 1;
            }
            ConsensusStatus::Success | ConsensusStatus::Other => {}
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let saved = self.json_tokens - self.slip_tokens;
        MetricsSnapshot {
            traffic_count: self.count,
            total_json_tokens: self.json_tokens,
            total_slip_tokens: self.slip_tokens,
            total_saved_tokens: saved,
            avg_savings_pct: if self.count == 0 {
                0.0
            } else {
                ratio(saved, self.json_tokens) * 100.0
            },
            avg_latency_ms: ratio(self.latency_sum, self.latency_count as f64),
            disagreement_rate_pct: ratio(self.disagreement_count as f64, self.count as f64)
                * 100.0,
            avg_recovery_time_ms: ratio(self.recovery_sum, self.recovery_count as f64),
            estimated_cost_savings_usd: saved * COST_PER_TOKEN_USD,
        }
    }
}

pub fn compute<'a>(events: impl IntoIterator<Item = &'a TrafficEvent>) -> MetricsSnapshot {
    let mut acc = MetricsAccumulator::default();
    for event in events {
        acc.push(event);
    }
    acc.snapshot()
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
    pub sub: &'static str,
}

impl MetricsSnapshot {
    pub fn cards(&self) -> Vec<MetricCard> {
        vec![
            MetricCard {
                label: "Avg Token Reduction",
                value: format!("{:.1}%", self.avg_savings_pct),
                sub: "vs JSON payload",
            },
            MetricCard {
                label: "Total Tokens Saved",
                value: group_thousands(self.total_saved_tokens),
                sub: "cumulative",
            },
            MetricCard {
                label: "Est. Cost Savings",
                value: format!("${:.4}", self.estimated_cost_savings_usd),
                sub: "@ $5 / 1M tokens",
            },
            MetricCard {
                label: "Avg Latency",
                value: format!("{:.0} ms", self.avg_latency_ms),
                sub: "network time",
            },
            MetricCard {
                label: "Disagreement Rate",
                value: format!("{:.1}%", self.disagreement_rate_pct),
                sub: "consensus failures",
            },
            MetricCard {
                label: "Avg Recovery Time",
                value: format!("{:.1}s", self.avg_recovery_time_ms / 1000.0),
                sub: "self-correction speed",
            },
        ]
    }
}

fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, digit) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if value < 0.0 && rounded != "0" {
        grouped.insert(0, '-');
    }
    grouped
}

#[cfg(test)]
#[path = "tests/metrics_tests.rs"]
mod tests;
