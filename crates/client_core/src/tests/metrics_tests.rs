use shared::domain::ConsensusStatus;

use super::*;

use crate::test_support::{assert_close, traffic, with_advanced};

#[test]
fn two_events_at_eighty_percent_average_eighty() {
    let mut first = traffic("1", "Planner", "Executor", 100.0, 20.0);
    first.metrics.savings_pct = 80.0;
    let mut second = traffic("2", "Executor", "QA", 50.0, 10.0);
    second.metrics.savings_pct = 80.0;

    let snapshot = compute([&first, &second]);
    assert_close(snapshot.total_saved_tokens, 120.0);
    assert_close(snapshot.avg_savings_pct, 80.0);
    assert_eq!(snapshot.traffic_count, 2);
}

#[test]
fn empty_history_yields_zeroes_without_dividing_by_zero() {
    let snapshot = compute(std::iter::empty());
    assert_eq!(snapshot, MetricsSnapshot::default());
    assert_eq!(snapshot.avg_savings_pct, 0.0);
    assert_eq!(snapshot.avg_latency_ms, 0.0);
    assert_eq!(snapshot.disagreement_rate_pct, 0.0);
    assert_eq!(snapshot.avg_recovery_time_ms, 0.0);
}

#[test]
fn incremental_accumulation_matches_full_recompute() {
    let events = vec![
        with_advanced(
            traffic("1", "Planner", "Executor", 88.0, 6.0),
            40.0,
            ConsensusStatus::Success,
            None,
        ),
        with_advanced(
            traffic("2", "Executor", "Backend", 31.5, 31.5),
            610.0,
            ConsensusStatus::Disagreement,
            Some(0.0),
        ),
        traffic("3", "Backend", "QA", 12.0, 3.0),
        with_advanced(
            traffic("4", "QA", "Planner", 140.25, 9.0),
            95.0,
            ConsensusStatus::Recovery,
            Some(2400.0),
        ),
        traffic("5", "Frontend", "Backend", 0.0, 0.0),
    ];

    let mut acc = MetricsAccumulator::default();
    for (seen, event) in events.iter().enumerate() {
        acc.push(event);
        let replayed = compute(&events[..=seen]);
        assert_eq!(acc.snapshot(), replayed, "diverged after {} events", seen + 1);
    }
}

#[test]
fn advanced_metrics_average_only_over_events_that_carry_them() {
    let events = vec![
        with_advanced(
            traffic("1", "Planner", "Executor", 10.0, 2.0),
            100.0,
            ConsensusStatus::Success,
            None,
        ),
        with_advanced(
            traffic("2", "Executor", "QA", 10.0, 2.0),
            300.0,
            ConsensusStatus::Disagreement,
            None,
        ),
        with_advanced(
            traffic("3", "QA", "Executor", 10.0, 2.0),
            50.0,
            ConsensusStatus::Recovery,
            Some(3000.0),
        ),
        traffic("4", "Executor", "Planner", 10.0, 2.0),
    ];

    let snapshot = compute(&events);
    assert_close(snapshot.avg_latency_ms, 150.0);
    assert_close(snapshot.disagreement_rate_pct, 25.0);
    assert_close(snapshot.avg_recovery_time_ms, 3000.0);
}

#[test]
fn recovery_average_is_zero_without_recovery_events() {
    let events = vec![with_advanced(
        traffic("1", "Planner", "Executor", 10.0, 2.0),
        20.0,
        ConsensusStatus::Disagreement,
        Some(500.0),
    )];
    let snapshot = compute(&events);
    assert_eq!(snapshot.avg_recovery_time_ms, 0.0);
    assert_close(snapshot.disagreement_rate_pct, 100.0);
}

#[test]
fn cards_format_like_the_dashboard() {
    let mut first = traffic("1", "Planner", "Executor", 1200.0, 100.0);
    first = with_advanced(first, 87.4, ConsensusStatus::Recovery, Some(2500.0));
    let snapshot = compute([&first]);

    let cards = snapshot.cards();
    let values: Vec<&str> = cards.iter().map(|card| card.value.as_str()).collect();
    assert_eq!(
        values,
        vec!["91.7%", "1,100", "$0.0055", "87 ms", "0.0%", "2.5s"]
    );
}

#[test]
fn groups_thousands_for_large_and_negative_values() {
    assert_eq!(group_thousands(0.0), "0");
    assert_eq!(group_thousands(999.4), "999");
    assert_eq!(group_thousands(1_234_567.0), "1,234,567");
    assert_eq!(group_thousands(-4321.0), "-4,321");
}
