//! Classification of inbound frames into the session's projections.

use chrono::Utc;
use shared::{
    domain::{ProposalId, TrafficId},
    protocol::{InboundFrame, ProposalEvent, TrafficEvent},
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{session::Session, topology::ParticleId};

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Resynced {
        traffic: usize,
        proposals: usize,
        skipped: usize,
    },
    Traffic {
        id: TrafficId,
        particle: Option<ParticleId>,
        fast_path: bool,
    },
    Proposal {
        id: ProposalId,
        mnemonic: String,
        queued: bool,
    },
    Ignored,
}

#[derive(Debug, Default)]
struct Partition {
    traffic: Vec<TrafficEvent>,
    proposals: Vec<ProposalEvent>,
    skipped: usize,
}

/// Splits a resync payload into traffic and proposals, preserving order.
/// Entries that fail to decode or carry any other kind are skipped.
fn partition(messages: Vec<serde_json::Value>) -> Partition {
    let mut partition = Partition::default();
    for value in messages {
        match InboundFrame::from_value(value) {
            Ok(InboundFrame::Traffic(event)) => partition.traffic.push(event),
            Ok(InboundFrame::Proposal(event)) => partition.proposals.push(event),
            Ok(other) => {
                debug!(kind = other.kind(), "ingest: skipping non-projected history entry");
                partition.skipped += 1;
            }
            Err(err) => {
                warn!(%err, "ingest: skipping malformed history entry");
                partition.skipped += 1;
            }
        }
    }
    partition
}

pub fn ingest_frame(session: &mut Session, frame: InboundFrame, now: Instant) -> IngestOutcome {
    match frame {
        InboundFrame::HistorySync { messages } => {
            let Partition {
                traffic,
                proposals,
                skipped,
            } = partition(messages);
            let counts = (traffic.len(), proposals.len());

            session.topology.discover_all(&traffic);
            session.history.replace(traffic, Utc::now());
            session.proposals.replace_all(proposals);
            session.lifecycle.resyncs += 1;
            session.lifecycle.stale = false;

            if session.lifecycle.resyncs > 1 {
                info!(
                    generation = session.lifecycle.generation,
                    "ingest: repeated resync on one connection; state replaced again"
                );
            }
            info!(
                traffic = counts.0,
                proposals = session.proposals.len(),
                skipped,
                "ingest: history resynchronized"
            );
            IngestOutcome::Resynced {
                traffic: counts.0,
                proposals: session.proposals.len(),
                skipped,
            }
        }
        InboundFrame::Traffic(event) => {
            let particle = session.topology.observe(&event, now);
            let id = event.id.clone();
            let fast_path = event.is_fast_path();
            debug!(traffic_id = %id, src = %event.src, dst = %event.dst, "ingest: traffic");
            session.history.append(event, Utc::now());
            IngestOutcome::Traffic {
                id,
                particle,
                fast_path,
            }
        }
        InboundFrame::Proposal(event) => {
            let id = event.id.clone();
            let mnemonic = event.mnemonic.clone();
            let queued = session.proposals.enqueue(event);
            debug!(proposal_id = %id, %mnemonic, queued, "ingest: proposal");
            IngestOutcome::Proposal {
                id,
                mnemonic,
                queued,
            }
        }
        InboundFrame::Unrecognized => {
            debug!("ingest: ignoring frame of unrecognized kind");
            IngestOutcome::Ignored
        }
    }
}

#[cfg(test)]
#[path = "tests/ingest_tests.rs"]
mod tests;
