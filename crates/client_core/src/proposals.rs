//! Human-in-the-loop approval of anchor proposals.
//!
//! Decisions are applied locally first and then announced to the control
//! plane without waiting for an answer. A resolved proposal never returns to
//! the live set, even if a later resync still lists it.

use std::{collections::HashSet, time::Duration};

use serde::Serialize;
use shared::{
    domain::ProposalId,
    protocol::{OutboundFrame, ProposalEvent},
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::connection::DecisionSink;

pub const NOTICE_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Pending,
    Approved,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub event: ProposalEvent,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub proposal: Proposal,
    /// Whether the frame reached the outbound queue. Informational only.
    pub submitted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProposalWorkflow {
    live: Vec<Proposal>,
    resolved: HashSet<ProposalId>,
    notice: Option<Notice>,
}

impl ProposalWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a newly arrived proposal. Returns false if it was already resolved.
    pub fn enqueue(&mut self, event: ProposalEvent) -> bool {
        if self.resolved.contains(&event.id) {
            debug!(proposal_id = %event.id, "proposals: ignoring already-resolved proposal");
            return false;
        }
        self.live.push(Proposal {
            event,
            resolution: Resolution::Pending,
        });
        true
    }

    /// Replaces the live set wholesale, as a resync does.
    pub fn replace_all(&mut self, events: Vec<ProposalEvent>) {
        self.live.clear();
        for event in events {
            self.enqueue(event);
        }
    }

    /// The proposal currently offered for a decision: the newest one.
    pub fn presented(&self) -> Option<&Proposal> {
        self.live.last()
    }

    /// All live proposals, newest first.
    pub fn queued(&self) -> impl Iterator<Item = &Proposal> {
        self.live.iter().rev()
    }

    pub fn live(&self) -> &[Proposal] {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn approve(
        &mut self,
        id: &ProposalId,
        sink: &dyn DecisionSink,
        now: Instant,
    ) -> Option<Decision> {
        let mut proposal = self.take(id)?;
        proposal.resolution = Resolution::Approved;
        let mnemonic = proposal.event.mnemonic.clone();
        let submitted = sink.submit(OutboundFrame::ApproveAnchor {
            mnemonic: mnemonic.clone(),
        });
        self.notice = Some(Notice {
            message: format!("Anchor '{mnemonic}' Registered to Universal Control Registry"),
            expires_at: now + NOTICE_DURATION,
        });
        info!(proposal_id = %id, %mnemonic, submitted, "proposals: approved");
        Some(Decision {
            proposal,
            submitted,
        })
    }

    pub fn dismiss(&mut self, id: &ProposalId, sink: &dyn DecisionSink) -> Option<Decision> {
        let mut proposal = self.take(id)?;
        proposal.resolution = Resolution::Dismissed;
        let submitted = sink.submit(OutboundFrame::DismissAnchor {
            mnemonic: proposal.event.mnemonic.clone(),
        });
        info!(
            proposal_id = %id,
            mnemonic = %proposal.event.mnemonic,
            submitted,
            "proposals: dismissed"
        );
        Some(Decision {
            proposal,
            submitted,
        })
    }

    pub fn approve_presented(&mut self, sink: &dyn DecisionSink, now: Instant) -> Option<Decision> {
        let id = self.presented()?.event.id.clone();
        self.approve(&id, sink, now)
    }

    pub fn dismiss_presented(&mut self, sink: &dyn DecisionSink) -> Option<Decision> {
        let id = self.presented()?.event.id.clone();
        self.dismiss(&id, sink)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Clears the confirmation notice once its time is up. Returns true if
    /// one was cleared.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        match &self.notice {
            Some(notice) if notice.expires_at <= now => {
                self.notice = None;
                true
            }
            _ => false,
        }
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.notice.as_ref().map(|notice| notice.expires_at)
    }

    fn take(&mut self, id: &ProposalId) -> Option<Proposal> {
        let Some(position) = self.live.iter().position(|p| &p.event.id == id) else {
            warn!(proposal_id = %id, "proposals: no live proposal with this id");
            return None;
        };
        let proposal = self.live.remove(position);
        self.resolved.insert(proposal.event.id.clone());
        Some(proposal)
    }
}

#[cfg(test)]
#[path = "tests/proposals_tests.rs"]
mod tests;
