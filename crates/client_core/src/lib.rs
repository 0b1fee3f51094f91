//! Observability client for the Slipstream control plane.
//!
//! The crate keeps a live, locally-owned picture of the agent mesh: traffic
//! history and aggregate metrics, a circular topology with transit
//! particles, and the queue of anchor proposals awaiting a human decision.
//! [`runtime::ClientRuntime`] drives it; everything else is plain state that
//! can be exercised without a socket.

use shared::domain::{ProposalId, TrafficId, WireMode};

pub mod config;
pub mod connection;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod proposals;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod topology;
pub mod traffic_log;

pub use config::{load_settings, Settings};
pub use connection::{ConnectionManager, DecisionSink, OutboundHandle, RECONNECT_DELAY};
pub use proposals::Resolution;
pub use registry::{AnchorSource, HttpAnchorRegistry, RegistryStatus, RegistryView};
pub use runtime::{ClientRuntime, Command, RuntimeError};
pub use session::{DashboardSnapshot, Session};
pub use topology::ParticleId;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    ConnectionChanged {
        connected: bool,
        generation: u64,
    },
    /// A `history_sync` replaced all projections.
    Resynced {
        traffic: usize,
        proposals: usize,
    },
    TrafficAppended {
        id: TrafficId,
    },
    ParticleSpawned {
        id: ParticleId,
        traffic_id: TrafficId,
        fast_path: bool,
    },
    ParticlesExpired {
        ids: Vec<ParticleId>,
    },
    ProposalQueued {
        id: ProposalId,
        mnemonic: String,
    },
    ProposalResolved {
        id: ProposalId,
        mnemonic: String,
        resolution: Resolution,
        submitted: bool,
    },
    WireModeChanged(WireMode),
    Notice(String),
    NoticeCleared,
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
