//! Chronological log projection, newest entry first.

use chrono::{DateTime, Utc};
use shared::domain::{TrafficId, WireMode};

use crate::history::{EventHistory, HistoryRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum WireView {
    Json {
        payload: String,
        tokens: f64,
    },
    Quantized {
        anchor: String,
        wire: String,
        tokens: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: TrafficId,
    pub received_at: DateTime<Utc>,
    pub src: String,
    pub dst: String,
    pub thought: String,
    pub wire: WireView,
    pub savings_badge: String,
}

impl LogEntry {
    fn from_record(record: &HistoryRecord, mode: WireMode) -> Self {
        let event = &record.event;
        let wire = match mode {
            WireMode::Json => WireView::Json {
                payload: event.json_equiv.clone().unwrap_or_default(),
                tokens: event.metrics.json_tokens,
            },
            WireMode::Quantized => WireView::Quantized {
                anchor: event.anchor.clone(),
                wire: event.slip_wire.clone(),
                tokens: event.metrics.slip_tokens,
            },
        };
        Self {
            id: event.id.clone(),
            received_at: record.received_at,
            src: event.src.clone(),
            dst: event.dst.clone(),
            thought: event.thought.clone(),
            wire,
            savings_badge: format!("{}% Reduction", event.metrics.savings_pct),
        }
    }

    pub fn render(&self) -> String {
        let wire = match &self.wire {
            WireView::Json { payload, tokens } => {
                format!("  Raw JSON ({tokens} tokens)\n    {payload}")
            }
            WireView::Quantized {
                anchor,
                wire,
                tokens,
            } => format!("  Slipstream Quantized ({tokens} tokens) anchor={anchor}\n    {wire}"),
        };
        format!(
            "[{}] {} -> {} #{}\n  \"{}\"\n{}\n  {}",
            self.received_at.format("%H:%M:%S"),
            initial(&self.src),
            initial(&self.dst),
            self.id,
            self.thought,
            wire,
            self.savings_badge
        )
    }
}

fn initial(name: &str) -> char {
    name.chars().next().unwrap_or('?')
}

pub fn project(history: &EventHistory, mode: WireMode, limit: Option<usize>) -> Vec<LogEntry> {
    history
        .records()
        .iter()
        .rev()
        .take(limit.unwrap_or(usize::MAX))
        .map(|record| LogEntry::from_record(record, mode))
        .collect()
}

pub fn header(event_count: usize) -> String {
    format!("Protocol Traffic | Live Feed • {event_count} events")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::test_support::traffic;

    fn history() -> EventHistory {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 15, 0).single().expect("time");
        let mut history = EventHistory::new();
        history.append(traffic("1", "Planner", "Executor", 100.0, 20.0), at);
        history.append(traffic("2", "Executor", "QA", 50.0, 50.0), at);
        let mut last = traffic("3", "QA", "Backend", 10.0, 2.0);
        last.metrics.savings_pct = 80.0;
        history.append(last, at);
        history
    }

    #[test]
    fn newest_entries_come_first_and_limit_applies() {
        let entries = project(&history(), WireMode::Quantized, Some(2));
        let ids: Vec<&str> = entries.iter().map(|e| e.id.0.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[test]
    fn wire_mode_selects_the_payload_shown() {
        let history = history();
        let json = project(&history, WireMode::Json, Some(1));
        assert_eq!(
            json[0].wire,
            WireView::Json {
                payload: "{\"from\":\"QA\",\"to\":\"Backend\"}".to_string(),
                tokens: 10.0
            }
        );

        let quantized = project(&history, WireMode::Quantized, Some(1));
        assert_eq!(
            quantized[0].wire,
            WireView::Quantized {
                anchor: "REQUEST-REVIEW".to_string(),
                wire: "SLIP v1 QA Backend REQUEST-REVIEW".to_string(),
                tokens: 2.0
            }
        );
        assert_eq!(quantized[0].savings_badge, "80% Reduction");
    }

    #[test]
    fn render_shows_initials_and_thought() {
        let entries = project(&history(), WireMode::Quantized, None);
        let rendered = entries[2].render();
        assert!(rendered.starts_with("[09:15:00] P -> E #1"));
        assert!(rendered.contains("\"Planner hands work to Executor\""));
        assert_eq!(header(history().len()), "Protocol Traffic | Live Feed • 3 events");
    }
}
