use shared::protocol::OutboundFrame;

use super::*;
use crate::test_support::{proposal, RecordingSink};

fn ids(workflow: &ProposalWorkflow) -> Vec<&str> {
    workflow.live().iter().map(|p| p.event.id.0.as_str()).collect()
}

#[test]
fn newest_pending_proposal_is_presented() {
    let mut workflow = ProposalWorkflow::new();
    assert!(workflow.presented().is_none());
    workflow.enqueue(proposal("p1", "CHECK-POLICY-2FA"));
    workflow.enqueue(proposal("p2", "ROLLBACK"));

    let presented = workflow.presented().expect("presented");
    assert_eq!(presented.event.id, ProposalId::from("p2"));
    assert_eq!(presented.resolution, Resolution::Pending);

    let queued: Vec<&str> = workflow.queued().map(|p| p.event.mnemonic.as_str()).collect();
    assert_eq!(queued, vec!["ROLLBACK", "CHECK-POLICY-2FA"]);
}

#[test]
fn approving_removes_exactly_that_proposal_and_emits_one_frame() {
    let sink = RecordingSink::default();
    let mut workflow = ProposalWorkflow::new();
    workflow.enqueue(proposal("p1", "DEPLOY-STAGING"));
    workflow.enqueue(proposal("p2", "RUN-TESTS"));
    workflow.enqueue(proposal("p3", "ROLLBACK"));

    let now = Instant::now();
    let decision = workflow
        .approve(&ProposalId::from("p2"), &sink, now)
        .expect("decision");
    assert_eq!(decision.proposal.resolution, Resolution::Approved);
    assert!(decision.submitted);
    assert_eq!(ids(&workflow), vec!["p1", "p3"]);
    assert_eq!(
        sink.frames(),
        vec![OutboundFrame::ApproveAnchor {
            mnemonic: "RUN-TESTS".to_string()
        }]
    );
}

#[test]
fn approval_shows_a_notice_for_three_seconds() {
    let sink = RecordingSink::default();
    let mut workflow = ProposalWorkflow::new();
    workflow.enqueue(proposal("p1", "CHECK-POLICY-2FA"));

    let now = Instant::now();
    workflow.approve_presented(&sink, now).expect("decision");
    let notice = workflow.notice().expect("notice");
    assert_eq!(
        notice.message,
        "Anchor 'CHECK-POLICY-2FA' Registered to Universal Control Registry"
    );
    assert_eq!(workflow.next_expiry(), Some(now + NOTICE_DURATION));

    assert!(!workflow.expire_notice(now + Duration::from_millis(2999)));
    assert!(workflow.expire_notice(now + NOTICE_DURATION));
    assert!(workflow.notice().is_none());
    assert!(!workflow.expire_notice(now + NOTICE_DURATION));
}

#[test]
fn dismissing_the_newest_leaves_the_older_one() {
    let sink = RecordingSink::default();
    let mut workflow = ProposalWorkflow::new();
    workflow.enqueue(proposal("p1", "CHECK-POLICY-2FA"));
    workflow.enqueue(proposal("p2", "ROLLBACK"));

    let decision = workflow.dismiss_presented(&sink).expect("decision");
    assert_eq!(decision.proposal.event.id, ProposalId::from("p2"));
    assert_eq!(decision.proposal.resolution, Resolution::Dismissed);
    assert_eq!(ids(&workflow), vec!["p1"]);
    assert_eq!(
        sink.frames(),
        vec![OutboundFrame::DismissAnchor {
            mnemonic: "ROLLBACK".to_string()
        }]
    );
    assert!(workflow.notice().is_none());
}

#[test]
fn resolved_proposals_are_never_requeued() {
    let sink = RecordingSink::default();
    let mut workflow = ProposalWorkflow::new();
    workflow.enqueue(proposal("p1", "ROLLBACK"));
    workflow.dismiss_presented(&sink).expect("decision");

    assert!(!workflow.enqueue(proposal("p1", "ROLLBACK")));
    workflow.replace_all(vec![proposal("p1", "ROLLBACK"), proposal("p4", "RUN-TESTS")]);
    assert_eq!(ids(&workflow), vec!["p4"]);

    assert!(workflow.approve(&ProposalId::from("p1"), &sink, Instant::now()).is_none());
    assert_eq!(sink.frames().len(), 1);
}

#[test]
fn failed_submission_does_not_roll_back_local_removal() {
    let sink = RecordingSink::rejecting();
    let mut workflow = ProposalWorkflow::new();
    workflow.enqueue(proposal("p1", "ROLLBACK"));

    let decision = workflow
        .approve_presented(&sink, Instant::now())
        .expect("decision");
    assert!(!decision.submitted);
    assert!(workflow.is_empty());
}

#[test]
fn deciding_with_nothing_pending_is_a_no_op() {
    let sink = RecordingSink::default();
    let mut workflow = ProposalWorkflow::new();
    assert!(workflow.approve_presented(&sink, Instant::now()).is_none());
    assert!(workflow.dismiss_presented(&sink).is_none());
    assert!(sink.frames().is_empty());
}
