//! Plain-text views of the dashboard.

use std::fmt::Write as _;

use client_core::{
    traffic_log, ClientEvent, DashboardSnapshot, RegistryStatus, RegistryView, Resolution,
};

pub fn status(snapshot: &DashboardSnapshot) -> String {
    let link = if snapshot.connected {
        format!("connected (generation {})", snapshot.generation)
    } else if snapshot.generation == 0 {
        "connecting...".to_string()
    } else {
        "disconnected; reconnecting".to_string()
    };
    let freshness = if snapshot.stale { ", showing stale data" } else { "" };
    format!(
        "{link}{freshness} | wire view: {} | {} events | {} pending proposals",
        snapshot.wire_mode.as_str(),
        snapshot.traffic_count,
        snapshot.queued.len()
    )
}

pub fn metrics(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::new();
    for card in snapshot.metrics.cards() {
        let _ = writeln!(out, "{:<20} {:>10}  {}", card.label, card.value, card.sub);
    }
    out.trim_end().to_string()
}

pub fn log(snapshot: &DashboardSnapshot, lines: usize) -> String {
    let mut out = traffic_log::header(snapshot.traffic_count);
    if snapshot.log.is_empty() {
        out.push_str("\n  Waiting for agent traffic...");
        return out;
    }
    for entry in snapshot.log.iter().take(lines) {
        out.push('\n');
        out.push_str(&entry.render());
    }
    out
}

pub fn graph(snapshot: &DashboardSnapshot) -> String {
    let mut out = format!(
        "{} nodes, {} links, {} in flight",
        snapshot.nodes.len(),
        snapshot.edges.len(),
        snapshot.particles.len()
    );
    for node in &snapshot.nodes {
        let _ = write!(
            out,
            "\n  {:<14} {:?}/{} at ({:.0}, {:.0})",
            node.name, node.style.icon, node.style.color, node.position.x, node.position.y
        );
    }
    for particle in &snapshot.particles {
        let lane = if particle.fast_path { "fast" } else { "legacy" };
        let _ = write!(
            out,
            "\n  #{} {lane} {:>3.0}% at ({:.0}, {:.0})",
            particle.traffic_id,
            particle.progress * 100.0,
            particle.position.x,
            particle.position.y
        );
    }
    out
}

pub fn proposals(snapshot: &DashboardSnapshot) -> String {
    let mut out = match &snapshot.presented {
        Some(proposal) => format!(
            "New Protocol Optimization\n  {} = {}",
            proposal.mnemonic, proposal.definition
        ),
        None => "No pending proposals".to_string(),
    };
    for proposal in snapshot.queued.iter().skip(1) {
        let _ = write!(out, "\n  queued: {} ({})", proposal.mnemonic, proposal.id);
    }
    if let Some(notice) = &snapshot.notice {
        let _ = write!(out, "\n{notice}");
    }
    out
}

pub fn registry(view: &RegistryView, query: &str) -> String {
    match view.status() {
        RegistryStatus::Loading => "Loading registry...".to_string(),
        RegistryStatus::Failed => "Anchor registry unavailable".to_string(),
        RegistryStatus::Ready => {
            let matches = view.filter(query);
            if matches.is_empty() {
                return "No anchors match".to_string();
            }
            let mut out = format!("{} of {} anchors", matches.len(), view.anchors().len());
            for anchor in matches {
                let _ = write!(out, "\n  {:<20} {}", anchor.mnemonic, anchor.definition);
            }
            out
        }
    }
}

/// One-line announcement for an event, if it is worth interrupting the operator.
pub fn event(event: &ClientEvent) -> Option<String> {
    match event {
        ClientEvent::ConnectionChanged {
            connected: true,
            generation,
        } => Some(format!("* connected to control plane (generation {generation})")),
        ClientEvent::ConnectionChanged {
            connected: false, ..
        } => Some("* control plane link lost; reconnecting".to_string()),
        ClientEvent::Resynced { traffic, proposals } => Some(format!(
            "* resynchronized: {traffic} events, {proposals} proposals"
        )),
        ClientEvent::ProposalQueued { mnemonic, .. } => Some(format!(
            "* new protocol optimization proposed: {mnemonic} (approve / dismiss)"
        )),
        ClientEvent::ProposalResolved {
            mnemonic,
            resolution: Resolution::Dismissed,
            ..
        } => Some(format!("* dismissed {mnemonic}")),
        ClientEvent::WireModeChanged(mode) => Some(format!("* wire view: {}", mode.as_str())),
        ClientEvent::Notice(message) => Some(format!("* {message}")),
        _ => None,
    }
}
