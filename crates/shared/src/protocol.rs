use serde::{Deserialize, Serialize};

use crate::{
    domain::{ConsensusStatus, ProposalId, TrafficId},
    error::FrameError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficMetrics {
    pub json_tokens: f64,
    pub slip_tokens: f64,
    pub savings_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedMetrics {
    pub latency_ms: f64,
    pub status: ConsensusStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_time_ms: Option<f64>,
}

/// One message exchanged between two participants, in both wire representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficEvent {
    pub id: TrafficId,
    pub src: String,
    pub dst: String,
    #[serde(default)]
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_equiv: Option<String>,
    #[serde(default)]
    pub anchor: String,
    #[serde(default)]
    pub slip_wire: String,
    pub metrics: TrafficMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced: Option<AdvancedMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TrafficEvent {
    /// True when the exchange travelled in quantized form: no verbose
    /// equivalent was attached, or the quantized form saved tokens.
    pub fn is_fast_path(&self) -> bool {
        let has_json_equiv = self
            .json_equiv
            .as_deref()
            .is_some_and(|payload| !payload.is_empty());
        !has_json_equiv || self.metrics.savings_pct > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalEvent {
    pub id: ProposalId,
    pub mnemonic: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_msg_id: Option<TrafficId>,
}

/// Frames pushed by the control plane.
///
/// `history_sync` entries stay as raw values so that a single bad entry does
/// not invalidate the entire resync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    HistorySync {
        #[serde(default)]
        messages: Vec<serde_json::Value>,
    },
    Traffic(TrafficEvent),
    Proposal(ProposalEvent),
    #[serde(other)]
    Unrecognized,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, FrameError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::HistorySync { .. } => "history_sync",
            Self::Traffic(_) => "traffic",
            Self::Proposal(_) => "proposal",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Decision frames sent back to the control plane. Never acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    ApproveAnchor { mnemonic: String },
    DismissAnchor { mnemonic: String },
}

impl OutboundFrame {
    pub fn mnemonic(&self) -> &str {
        match self {
            Self::ApproveAnchor { mnemonic } | Self::DismissAnchor { mnemonic } => mnemonic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub mnemonic: String,
    pub definition: String,
}
