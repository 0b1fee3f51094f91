//! The client's event loop.
//!
//! One task owns the [`Session`]. Connection signals, operator commands and
//! expiry timers are all serialized through a single `select!`, so no two
//! mutations ever race. Observers get a broadcast of [`ClientEvent`]s and a
//! watch channel holding the latest [`DashboardSnapshot`].

use shared::domain::{ProposalId, WireMode};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    connection::{ConnectionManager, ConnectionSignal, ConnectionTask, DecisionSink},
    session::{DashboardSnapshot, Session},
    ClientEvent,
};

const SIGNAL_QUEUE_DEPTH: usize = 256;
const COMMAND_QUEUE_DEPTH: usize = 32;
const EVENT_BUFFER: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ApprovePresented,
    DismissPresented,
    Approve(ProposalId),
    Dismiss(ProposalId),
    SetWireMode(WireMode),
    Shutdown,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("client runtime has stopped")]
    Stopped,
}

pub struct ClientRuntime {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<ClientEvent>,
    snapshot: watch::Receiver<DashboardSnapshot>,
    join: JoinHandle<()>,
}

impl ClientRuntime {
    /// Opens the control-plane connection and starts the loop. Must be
    /// called from within a tokio runtime.
    pub fn start(manager: ConnectionManager, wire_mode: WireMode) -> Self {
        info!(url = manager.url(), wire_mode = wire_mode.as_str(), "runtime: starting");
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_QUEUE_DEPTH);
        let connection = manager.spawn(signal_tx);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let session = Session::new(wire_mode);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot(Instant::now()));
        let join = tokio::spawn(run_loop(
            session,
            connection,
            signal_rx,
            command_rx,
            events.clone(),
            snapshot_tx,
        ));

        Self {
            commands: command_tx,
            events,
            snapshot: snapshot_rx,
            join,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot.clone()
    }

    pub async fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::Stopped)
    }

    pub async fn approve_presented(&self) -> Result<(), RuntimeError> {
        self.send(Command::ApprovePresented).await
    }

    pub async fn dismiss_presented(&self) -> Result<(), RuntimeError> {
        self.send(Command::DismissPresented).await
    }

    pub async fn set_wire_mode(&self, mode: WireMode) -> Result<(), RuntimeError> {
        self.send(Command::SetWireMode(mode)).await
    }

    /// Tears the connection down and waits for the loop to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Err(err) = self.join.await {
            warn!(%err, "runtime: loop ended abnormally");
        }
    }
}

fn apply(session: &mut Session, command: Command, sink: &dyn DecisionSink) -> Vec<ClientEvent> {
    let now = Instant::now();
    match command {
        Command::ApprovePresented => session.approve_presented(sink, now),
        Command::DismissPresented => session.dismiss_presented(sink),
        Command::Approve(id) => session.approve(&id, sink, now),
        Command::Dismiss(id) => session.dismiss(&id, sink),
        Command::SetWireMode(mode) => {
            if session.wire_mode() == mode {
                return Vec::new();
            }
            session.set_wire_mode(mode);
            vec![ClientEvent::WireModeChanged(mode)]
        }
        // handled by the loop
        Command::Shutdown => Vec::new(),
    }
}

async fn run_loop(
    mut session: Session,
    connection: ConnectionTask,
    mut signals: mpsc::Receiver<ConnectionSignal>,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<ClientEvent>,
    snapshot: watch::Sender<DashboardSnapshot>,
) {
    let outbound = connection.outbound();
    loop {
        let deadline = session.next_deadline();
        let emitted = tokio::select! {
            signal = signals.recv() => match signal {
                Some(ConnectionSignal::Connected) => vec![session.on_connected()],
                Some(ConnectionSignal::Disconnected) => vec![session.on_disconnected()],
                Some(ConnectionSignal::Frame(frame)) => session.ingest(frame, Instant::now()),
                None => {
                    warn!("runtime: connection task stopped unexpectedly");
                    break;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => {
                    debug!(?command, "runtime: command");
                    apply(&mut session, command, &outbound)
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                session.expire(Instant::now())
            }
        };

        if emitted.is_empty() {
            continue;
        }
        for event in emitted {
            // no subscribers is fine
            let _ = events.send(event);
        }
        snapshot.send_replace(session.snapshot(Instant::now()));
    }

    info!("runtime: shutting down");
    connection.shutdown().await;
}
