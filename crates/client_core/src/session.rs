//! The single owned session state and its lifecycle.
//!
//! A `Session` lives for the whole run of the client. Each successful connect
//! opens a new generation; a resync resets the projections; a disconnect
//! marks them stale but keeps them on screen until the next resync.

use shared::{
    domain::{ProposalId, TrafficId, WireMode},
    protocol::{InboundFrame, ProposalEvent},
};
use tokio::time::Instant;
use tracing::debug;

use crate::{
    connection::DecisionSink,
    history::EventHistory,
    ingest::{ingest_frame, IngestOutcome},
    metrics::{self, MetricsSnapshot},
    proposals::{Decision, ProposalWorkflow, Resolution},
    topology::{LaidOutNode, ParticleId, Point, TopologyEngine},
    traffic_log::{self, LogEntry},
    ClientEvent,
};

/// Upper bound on log entries carried in each published snapshot.
pub const SNAPSHOT_LOG_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    pub connected: bool,
    pub generation: u64,
    /// Resyncs applied during the current generation.
    pub resyncs: u32,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleView {
    pub id: ParticleId,
    pub traffic_id: TrafficId,
    pub fast_path: bool,
    pub from: Point,
    pub to: Point,
    pub position: Point,
    pub progress: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub connected: bool,
    pub stale: bool,
    pub generation: u64,
    pub wire_mode: WireMode,
    pub metrics: MetricsSnapshot,
    pub traffic_count: usize,
    pub nodes: Vec<LaidOutNode>,
    pub edges: Vec<(String, String)>,
    pub particles: Vec<ParticleView>,
    pub log: Vec<LogEntry>,
    pub presented: Option<ProposalEvent>,
    /// Live proposals, newest first.
    pub queued: Vec<ProposalEvent>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) history: EventHistory,
    pub(crate) topology: TopologyEngine,
    pub(crate) proposals: ProposalWorkflow,
    pub(crate) lifecycle: Lifecycle,
    wire_mode: WireMode,
}

impl Session {
    pub fn new(wire_mode: WireMode) -> Self {
        Self {
            wire_mode,
            ..Self::default()
        }
    }

    pub fn history(&self) -> &EventHistory {
        &self.history
    }

    pub fn topology(&self) -> &TopologyEngine {
        &self.topology
    }

    pub fn proposals(&self) -> &ProposalWorkflow {
        &self.proposals
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn wire_mode(&self) -> WireMode {
        self.wire_mode
    }

    pub fn set_wire_mode(&mut self, mode: WireMode) {
        self.wire_mode = mode;
    }

    /// Recomputed from the entire history on every call.
    pub fn metrics(&self) -> MetricsSnapshot {
        metrics::compute(self.history.events())
    }

    pub fn on_connected(&mut self) -> ClientEvent {
        self.lifecycle.connected = true;
        self.lifecycle.generation += 1;
        self.lifecycle.resyncs = 0;
        ClientEvent::ConnectionChanged {
            connected: true,
            generation: self.lifecycle.generation,
        }
    }

    pub fn on_disconnected(&mut self) -> ClientEvent {
        self.lifecycle.connected = false;
        self.lifecycle.stale = true;
        ClientEvent::ConnectionChanged {
            connected: false,
            generation: self.lifecycle.generation,
        }
    }

    pub fn ingest(&mut self, frame: InboundFrame, now: Instant) -> Vec<ClientEvent> {
        match ingest_frame(self, frame, now) {
            IngestOutcome::Resynced {
                traffic, proposals, ..
            } => vec![ClientEvent::Resynced { traffic, proposals }],
            IngestOutcome::Traffic {
                id,
                particle,
                fast_path,
            } => {
                let mut events = vec![ClientEvent::TrafficAppended { id: id.clone() }];
                if let Some(particle) = particle {
                    events.push(ClientEvent::ParticleSpawned {
                        id: particle,
                        traffic_id: id,
                        fast_path,
                    });
                }
                events
            }
            IngestOutcome::Proposal {
                id,
                mnemonic,
                queued: true,
            } => vec![ClientEvent::ProposalQueued { id, mnemonic }],
            IngestOutcome::Proposal { queued: false, .. } | IngestOutcome::Ignored => Vec::new(),
        }
    }

    pub fn approve_presented(&mut self, sink: &dyn DecisionSink, now: Instant) -> Vec<ClientEvent> {
        let decision = self.proposals.approve_presented(sink, now);
        self.decided(decision)
    }

    pub fn dismiss_presented(&mut self, sink: &dyn DecisionSink) -> Vec<ClientEvent> {
        let decision = self.proposals.dismiss_presented(sink);
        self.decided(decision)
    }

    pub fn approve(
        &mut self,
        id: &ProposalId,
        sink: &dyn DecisionSink,
        now: Instant,
    ) -> Vec<ClientEvent> {
        let decision = self.proposals.approve(id, sink, now);
        self.decided(decision)
    }

    pub fn dismiss(&mut self, id: &ProposalId, sink: &dyn DecisionSink) -> Vec<ClientEvent> {
        let decision = self.proposals.dismiss(id, sink);
        self.decided(decision)
    }

    fn decided(&self, decision: Option<Decision>) -> Vec<ClientEvent> {
        let Some(decision) = decision else {
            debug!("session: no proposal to decide");
            return Vec::new();
        };
        let resolution = decision.proposal.resolution;
        let mut events = vec![ClientEvent::ProposalResolved {
            id: decision.proposal.event.id,
            mnemonic: decision.proposal.event.mnemonic,
            resolution,
            submitted: decision.submitted,
        }];
        if resolution == Resolution::Approved {
            if let Some(notice) = self.proposals.notice() {
                events.push(ClientEvent::Notice(notice.message.clone()));
            }
        }
        events
    }

    /// Fires every timer due at `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        let expired = self.topology.expire_due(now);
        if !expired.is_empty() {
            events.push(ClientEvent::ParticlesExpired { ids: expired });
        }
        if self.proposals.expire_notice(now) {
            events.push(ClientEvent::NoticeCleared);
        }
        events
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.topology.next_expiry(), self.proposals.next_expiry()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn snapshot(&self, now: Instant) -> DashboardSnapshot {
        DashboardSnapshot {
            connected: self.lifecycle.connected,
            stale: self.lifecycle.stale,
            generation: self.lifecycle.generation,
            wire_mode: self.wire_mode,
            metrics: self.metrics(),
            traffic_count: self.history.len(),
            nodes: self.topology.layout().to_vec(),
            edges: self
                .topology
                .edges()
                .into_iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            particles: self
                .topology
                .particles()
                .into_iter()
                .map(|particle| ParticleView {
                    id: particle.id,
                    traffic_id: particle.traffic_id.clone(),
                    fast_path: particle.fast_path,
                    from: particle.from,
                    to: particle.to,
                    position: particle.position(now),
                    progress: particle.progress(now),
                })
                .collect(),
            log: traffic_log::project(&self.history, self.wire_mode, Some(SNAPSHOT_LOG_LIMIT)),
            presented: self.proposals.presented().map(|p| p.event.clone()),
            queued: self.proposals.queued().map(|p| p.event.clone()).collect(),
            notice: self.proposals.notice().map(|n| n.message.clone()),
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
