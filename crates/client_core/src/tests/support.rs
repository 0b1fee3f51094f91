use shared::{
    domain::{ConsensusStatus, ProposalId, TrafficId},
    protocol::{AdvancedMetrics, ProposalEvent, TrafficEvent, TrafficMetrics},
};

pub(crate) fn traffic(id: &str, src: &str, dst: &str, json_tokens: f64, slip_tokens: f64) -> TrafficEvent {
    let savings_pct = if slip_tokens < json_tokens && json_tokens > 0.0 {
        (1.0 - slip_tokens / json_tokens) * 100.0
    } else {
        0.0
    };
    TrafficEvent {
        id: TrafficId::from(id),
        src: src.to_string(),
        dst: dst.to_string(),
        thought: format!("{src} hands work to {dst}"),
        json_equiv: Some(format!("{{\"from\":\"{src}\",\"to\":\"{dst}\"}}")),
        anchor: "REQUEST-REVIEW".to_string(),
        slip_wire: format!("SLIP v1 {src} {dst} REQUEST-REVIEW"),
        metrics: TrafficMetrics {
            json_tokens,
            slip_tokens,
            savings_pct,
        },
        advanced: None,
        timestamp: None,
    }
}

pub(crate) fn with_advanced(
    mut event: TrafficEvent,
    latency_ms: f64,
    status: ConsensusStatus,
    recovery_time_ms: Option<f64>,
) -> TrafficEvent {
    event.advanced = Some(AdvancedMetrics {
        latency_ms,
        status,
        recovery_time_ms,
    });
    event
}

pub(crate) fn proposal(id: &str, mnemonic: &str) -> ProposalEvent {
    ProposalEvent {
        id: ProposalId::from(id),
        mnemonic: mnemonic.to_string(),
        definition: format!("definition of {mnemonic}"),
        trigger_msg_id: None,
    }
}

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// Captures decision frames instead of sending them.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) frames: std::sync::Mutex<Vec<shared::protocol::OutboundFrame>>,
    pub(crate) reject: bool,
}

impl RecordingSink {
    pub(crate) fn rejecting() -> Self {
        Self {
            frames: std::sync::Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub(crate) fn frames(&self) -> Vec<shared::protocol::OutboundFrame> {
        self.frames.lock().expect("sink lock").clone()
    }
}

impl crate::connection::DecisionSink for RecordingSink {
    fn submit(&self, frame: shared::protocol::OutboundFrame) -> bool {
        if self.reject {
            return false;
        }
        self.frames.lock().expect("sink lock").push(frame);
        true
    }
}
