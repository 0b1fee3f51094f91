use serde_json::json;
use shared::protocol::InboundFrame;
use tokio::time::Instant;

use super::*;
use crate::test_support::{proposal, traffic};

fn traffic_value(id: &str, src: &str, dst: &str) -> serde_json::Value {
    let mut value = serde_json::to_value(traffic(id, src, dst, 100.0, 20.0)).expect("encode traffic");
    value["type"] = json!("traffic");
    value
}

fn proposal_value(id: &str, mnemonic: &str) -> serde_json::Value {
    let mut value = serde_json::to_value(proposal(id, mnemonic)).expect("encode proposal");
    value["type"] = json!("proposal");
    value
}

fn history_ids(session: &Session) -> Vec<String> {
    session.history.events().map(|e| e.id.to_string()).collect()
}

#[test]
fn live_traffic_is_appended_in_arrival_order() {
    let mut session = Session::default();
    let now = Instant::now();
    for id in ["a", "b", "c"] {
        let outcome = ingest_frame(
            &mut session,
            InboundFrame::Traffic(traffic(id, "Planner", "Executor", 50.0, 10.0)),
            now,
        );
        assert!(matches!(outcome, IngestOutcome::Traffic { fast_path: true, .. }));
    }
    assert_eq!(history_ids(&session), ["a", "b", "c"]);
    assert_eq!(session.topology.particle_count(), 3);
}

#[test]
fn history_sync_replaces_everything_accumulated_before() {
    let mut session = Session::default();
    let now = Instant::now();
    ingest_frame(
        &mut session,
        InboundFrame::Traffic(traffic("old", "Planner", "QA", 10.0, 5.0)),
        now,
    );
    ingest_frame(&mut session, InboundFrame::Proposal(proposal("p-old", "OLD")), now);

    let outcome = ingest_frame(
        &mut session,
        InboundFrame::HistorySync {
            messages: vec![
                traffic_value("h1", "Planner", "Executor"),
                proposal_value("p1", "CHECK-IN"),
                traffic_value("h2", "Executor", "Archivist"),
            ],
        },
        now,
    );

    assert_eq!(
        outcome,
        IngestOutcome::Resynced {
            traffic: 2,
            proposals: 1,
            skipped: 0,
        }
    );
    assert_eq!(history_ids(&session), ["h1", "h2"]);
    let live: Vec<&str> = session
        .proposals
        .live()
        .iter()
        .map(|p| p.event.mnemonic.as_str())
        .collect();
    assert_eq!(live, ["CHECK-IN"]);
    // resync discovers the endpoints it mentions without animating them
    assert!(session.topology.position("Archivist").is_some());
    assert_eq!(session.topology.particle_count(), 1);
    assert_eq!(session.lifecycle.resyncs, 1);
}

#[test]
fn bad_history_entries_are_skipped_individually() {
    let mut session = Session::default();
    let outcome = ingest_frame(
        &mut session,
        InboundFrame::HistorySync {
            messages: vec![
                traffic_value("h1", "Planner", "Executor"),
                json!({ "type": "traffic", "id": "broken" }),
                json!({ "type": "heartbeat", "seq": 4 }),
                json!("not an object"),
                traffic_value("h2", "QA", "Planner"),
            ],
        },
        Instant::now(),
    );

    assert_eq!(
        outcome,
        IngestOutcome::Resynced {
            traffic: 2,
            proposals: 0,
            skipped: 3,
        }
    );
    assert_eq!(history_ids(&session), ["h1", "h2"]);
}

#[test]
fn empty_history_sync_clears_state() {
    let mut session = Session::default();
    let now = Instant::now();
    ingest_frame(
        &mut session,
        InboundFrame::Traffic(traffic("a", "Planner", "QA", 10.0, 5.0)),
        now,
    );
    ingest_frame(&mut session, InboundFrame::Proposal(proposal("p1", "X")), now);

    ingest_frame(&mut session, InboundFrame::HistorySync { messages: Vec::new() }, now);
    assert!(session.history.is_empty());
    assert!(session.proposals.is_empty());
}

#[test]
fn second_resync_on_one_connection_replaces_state_again() {
    let mut session = Session::default();
    let now = Instant::now();
    ingest_frame(
        &mut session,
        InboundFrame::HistorySync {
            messages: vec![traffic_value("h1", "Planner", "Executor")],
        },
        now,
    );
    ingest_frame(
        &mut session,
        InboundFrame::HistorySync {
            messages: vec![
                traffic_value("h2", "Planner", "QA"),
                traffic_value("h3", "QA", "Planner"),
            ],
        },
        now,
    );
    assert_eq!(history_ids(&session), ["h2", "h3"]);
    assert_eq!(session.lifecycle.resyncs, 2);
}

#[test]
fn resync_clears_the_stale_flag() {
    let mut session = Session::default();
    session.lifecycle.stale = true;
    ingest_frame(
        &mut session,
        InboundFrame::HistorySync { messages: Vec::new() },
        Instant::now(),
    );
    assert!(!session.lifecycle.stale);
}

#[test]
fn proposals_are_queued_as_they_arrive() {
    let mut session = Session::default();
    let now = Instant::now();
    let first = ingest_frame(&mut session, InboundFrame::Proposal(proposal("p1", "A")), now);
    ingest_frame(&mut session, InboundFrame::Proposal(proposal("p2", "B")), now);

    assert_eq!(
        first,
        IngestOutcome::Proposal {
            id: "p1".into(),
            mnemonic: "A".to_string(),
            queued: true,
        }
    );
    assert_eq!(session.proposals.len(), 2);
    assert_eq!(
        session.proposals.presented().map(|p| p.event.mnemonic.as_str()),
        Some("B")
    );
}

#[test]
fn unrecognized_frames_change_nothing() {
    let mut session = Session::default();
    let outcome = ingest_frame(&mut session, InboundFrame::Unrecognized, Instant::now());
    assert_eq!(outcome, IngestOutcome::Ignored);
    assert!(session.history.is_empty());
    assert!(session.proposals.is_empty());
    assert_eq!(session.topology.nodes().len(), 5);
}
