use chrono::{DateTime, Utc};
use shared::protocol::TrafficEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub event: TrafficEvent,
    pub received_at: DateTime<Utc>,
}

/// Append-only traffic history. Only a resync replaces it.
#[derive(Debug, Clone, Default)]
pub struct EventHistory {
    records: Vec<HistoryRecord>,
}

impl EventHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: TrafficEvent, received_at: DateTime<Utc>) {
        self.records.push(HistoryRecord { event, received_at });
    }

    pub fn replace(&mut self, events: Vec<TrafficEvent>, received_at: DateTime<Utc>) {
        self.records = events
            .into_iter()
            .map(|event| HistoryRecord { event, received_at })
            .collect();
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn events(&self) -> impl DoubleEndedIterator<Item = &TrafficEvent> + ExactSizeIterator {
        self.records.iter().map(|record| &record.event)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
