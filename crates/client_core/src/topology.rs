//! Participant discovery, circular layout, and transient traffic particles.
//!
//! Positions are a pure function of the ordered node list, so two engines
//! that discovered the same names in the same order agree exactly. Particles
//! carry their own deadline; the runtime loop sleeps until the earliest one
//! and calls [`TopologyEngine::expire_due`].

use std::{
    collections::HashMap,
    f64::consts::{FRAC_PI_2, TAU},
    fmt,
    time::Duration,
};

use serde::Serialize;
use shared::{domain::TrafficId, protocol::TrafficEvent};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_ROSTER: [&str; 5] = ["Planner", "Executor", "Frontend", "Backend", "QA"];

pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 500.0;
pub const LAYOUT_RADIUS: f64 = 180.0;
/// Extra rotation applied to every node, in radians.
pub const LAYOUT_PHASE: f64 = 0.0;

pub const FAST_PATH_LIFETIME: Duration = Duration::from_millis(600);
pub const LEGACY_LIFETIME: Duration = Duration::from_millis(1800);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn lerp(self, to: Point, t: f64) -> Point {
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeIcon {
    Brain,
    Server,
    Laptop,
    Database,
    Globe,
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeStyle {
    pub icon: NodeIcon,
    pub color: &'static str,
}

pub fn style_for(name: &str) -> NodeStyle {
    let (icon, color) = match name {
        "Planner" => (NodeIcon::Brain, "purple"),
        "Executor" => (NodeIcon::Server, "blue"),
        "Frontend" => (NodeIcon::Laptop, "pink"),
        "Backend" => (NodeIcon::Database, "green"),
        "QA" => (NodeIcon::Globe, "orange"),
        "HumanOperator" => (NodeIcon::User, "white"),
        _ => (NodeIcon::Bot, "gray"),
    };
    NodeStyle { icon, color }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaidOutNode {
    pub name: String,
    pub index: usize,
    pub position: Point,
    pub style: NodeStyle,
}

/// Places `names` evenly on a circle, first name at the top, clockwise in
/// screen coordinates.
pub fn circular_layout(names: &[String]) -> Vec<LaidOutNode> {
    let count = names.len() as f64;
    let center = Point {
        x: CANVAS_WIDTH / 2.0,
        y: CANVAS_HEIGHT / 2.0,
    };
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let angle = (index as f64 / count) * TAU - FRAC_PI_2 + LAYOUT_PHASE;
            LaidOutNode {
                name: name.clone(),
                index,
                position: Point {
                    x: center.x + LAYOUT_RADIUS * angle.cos(),
                    y: center.y + LAYOUT_RADIUS * angle.sin(),
                },
                style: style_for(name),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ParticleId(pub Uuid);

impl ParticleId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub traffic_id: TrafficId,
    pub from: Point,
    pub to: Point,
    pub fast_path: bool,
    pub lifetime: Duration,
    pub spawned_at: Instant,
    pub expires_at: Instant,
}

impl Particle {
    /// Fraction of the transit completed at `now`, clamped to `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.spawned_at);
        (elapsed.as_secs_f64() / self.lifetime.as_secs_f64()).min(1.0)
    }

    pub fn position(&self, now: Instant) -> Point {
        self.from.lerp(self.to, self.progress(now))
    }
}

#[derive(Debug, Clone)]
pub struct TopologyEngine {
    nodes: Vec<String>,
    layout: Vec<LaidOutNode>,
    index: HashMap<String, usize>,
    particles: HashMap<ParticleId, Particle>,
}

impl Default for TopologyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyEngine {
    pub fn new() -> Self {
        Self::with_roster(DEFAULT_ROSTER)
    }

    pub fn with_roster<I, S>(roster: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut engine = Self {
            nodes: Vec::new(),
            layout: Vec::new(),
            index: HashMap::new(),
            particles: HashMap::new(),
        };
        for name in roster {
            let name = name.into();
            if !engine.index.contains_key(&name) {
                engine.index.insert(name.clone(), engine.nodes.len());
                engine.nodes.push(name);
            }
        }
        engine.relayout();
        engine
    }

    /// Adds `name` if it has not been seen. Returns true when the node set
    /// grew and the layout was recomputed.
    pub fn discover(&mut self, name: &str) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(name.to_string());
        self.relayout();
        debug!(node = name, nodes = self.nodes.len(), "topology: discovered node");
        true
    }

    /// Discovers every endpoint of `events` without spawning particles.
    pub fn discover_all<'a>(&mut self, events: impl IntoIterator<Item = &'a TrafficEvent>) {
        for event in events {
            self.discover(&event.src);
            self.discover(&event.dst);
        }
    }

    /// Handles one live traffic event. The particle is scheduled against the
    /// layout as it stood before this event's endpoints were discovered.
    pub fn observe(&mut self, event: &TrafficEvent, now: Instant) -> Option<ParticleId> {
        let particle = self.spawn_particle(event, now);
        self.discover(&event.src);
        self.discover(&event.dst);
        particle
    }

    pub fn spawn_particle(&mut self, event: &TrafficEvent, now: Instant) -> Option<ParticleId> {
        let (Some(from), Some(to)) = (self.position(&event.src), self.position(&event.dst)) else {
            debug!(
                traffic_id = %event.id,
                src = %event.src,
                dst = %event.dst,
                "topology: endpoint not laid out; skipping particle"
            );
            return None;
        };
        let fast_path = event.is_fast_path();
        let lifetime = if fast_path {
            FAST_PATH_LIFETIME
        } else {
            LEGACY_LIFETIME
        };
        let particle = Particle {
            id: ParticleId::new(),
            traffic_id: event.id.clone(),
            from,
            to,
            fast_path,
            lifetime,
            spawned_at: now,
            expires_at: now + lifetime,
        };
        let id = particle.id;
        self.particles.insert(id, particle);
        Some(id)
    }

    /// Removes every particle whose lifetime has elapsed at `now`.
    pub fn expire_due(&mut self, now: Instant) -> Vec<ParticleId> {
        let due: Vec<ParticleId> = self
            .particles
            .values()
            .filter(|particle| particle.expires_at <= now)
            .map(|particle| particle.id)
            .collect();
        for &id in &due {
            self.remove_particle(id);
        }
        due
    }

    /// Removing an unknown id is a no-op.
    pub fn remove_particle(&mut self, id: ParticleId) -> bool {
        self.particles.remove(&id).is_some()
    }

    pub fn next_expiry(&self) -> Option<Instant> {
        self.particles.values().map(|p| p.expires_at).min()
    }

    pub fn position(&self, name: &str) -> Option<Point> {
        self.index.get(name).map(|&i| self.layout[i].position)
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn layout(&self) -> &[LaidOutNode] {
        &self.layout
    }

    /// Every unordered pair of laid-out nodes, in layout order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges = Vec::new();
        for (i, a) in self.layout.iter().enumerate() {
            for b in &self.layout[i + 1..] {
                edges.push((a.name.as_str(), b.name.as_str()));
            }
        }
        edges
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(&id)
    }

    /// Live particles, oldest first.
    pub fn particles(&self) -> Vec<&Particle> {
        let mut particles: Vec<&Particle> = self.particles.values().collect();
        particles.sort_by_key(|p| p.spawned_at);
        particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    fn relayout(&mut self) {
        self.layout = circular_layout(&self.nodes);
    }
}

#[cfg(test)]
#[path = "tests/topology_tests.rs"]
mod tests;
