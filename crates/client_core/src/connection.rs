//! Persistent duplex channel to the control plane.
//!
//! One task owns the websocket. It forwards decoded frames and connectivity
//! changes to the runtime loop, and writes decision frames submitted through
//! [`OutboundHandle`]. Decisions are only accepted while the channel is open;
//! nothing is held back for a later connection. When the channel closes for
//! any reason other than teardown, it waits for the reconnect delay and tries
//! again, forever.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use shared::protocol::{InboundFrame, OutboundFrame};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);
const OUTBOUND_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSignal {
    Connected,
    Disconnected,
    Frame(InboundFrame),
}

/// Anything that accepts decision frames without acknowledging them.
pub trait DecisionSink: Send + Sync {
    /// Returns false when the frame was dropped locally.
    fn submit(&self, frame: OutboundFrame) -> bool;
}

#[derive(Debug, Clone)]
pub struct OutboundHandle {
    tx: mpsc::Sender<OutboundFrame>,
    open: Arc<AtomicBool>,
}

impl OutboundHandle {
    /// Whether the channel is currently open for decision frames.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl DecisionSink for OutboundHandle {
    fn submit(&self, frame: OutboundFrame) -> bool {
        if !self.is_open() {
            warn!(mnemonic = frame.mnemonic(), "control plane: disconnected; dropping decision");
            return false;
        }
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                warn!(mnemonic = frame.mnemonic(), "control plane: outbound queue full; dropping decision");
                false
            }
            Err(mpsc::error::TrySendError::Closed(frame)) => {
                warn!(mnemonic = frame.mnemonic(), "control plane: connection task gone; dropping decision");
                false
            }
        }
    }
}

pub struct ConnectionManager {
    url: String,
    reconnect_delay: Duration,
}

pub struct ConnectionTask {
    outbound: OutboundHandle,
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ConnectionTask {
    pub fn outbound(&self) -> OutboundHandle {
        self.outbound.clone()
    }

    /// Closes the channel. No reconnection is attempted afterwards.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            warn!(%err, "control plane: connection task ended abnormally");
        }
    }
}

enum SessionEnd {
    /// The websocket never opened.
    Unreachable,
    Closed,
    Shutdown,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn spawn(self, signals: mpsc::Sender<ConnectionSignal>) -> ConnectionTask {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let open = Arc::new(AtomicBool::new(false));
        let join = tokio::spawn(self.run(signals, outbound_rx, shutdown_rx, Arc::clone(&open)));
        ConnectionTask {
            outbound: OutboundHandle {
                tx: outbound_tx,
                open,
            },
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run(
        self,
        signals: mpsc::Sender<ConnectionSignal>,
        mut outbound_rx: mpsc::Receiver<OutboundFrame>,
        mut shutdown_rx: watch::Receiver<bool>,
        open: Arc<AtomicBool>,
    ) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            discard_stale(&mut outbound_rx);
            let end = self
                .run_once(&signals, &mut outbound_rx, &mut shutdown_rx, &open)
                .await;
            open.store(false, Ordering::Release);
            match end {
                SessionEnd::Shutdown => break,
                // only a channel that actually opened reports losing it
                SessionEnd::Closed => {
                    if signals.send(ConnectionSignal::Disconnected).await.is_err() {
                        break;
                    }
                }
                SessionEnd::Unreachable => {}
            }

            info!(
                url = %self.url,
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "control plane: reconnect scheduled"
            );
            let retry = tokio::time::sleep(self.reconnect_delay);
            tokio::pin!(retry);
            let stop = loop {
                tokio::select! {
                    _ = &mut retry => break false,
                    _ = shutdown_rx.changed() => break true,
                    Some(frame) = outbound_rx.recv() => {
                        warn!(
                            mnemonic = frame.mnemonic(),
                            "control plane: disconnected; dropping decision frame"
                        );
                    }
                }
            };
            if stop {
                break;
            }
        }
        debug!(url = %self.url, "control plane: connection task stopped");
    }

    async fn run_once(
        &self,
        signals: &mpsc::Sender<ConnectionSignal>,
        outbound_rx: &mut mpsc::Receiver<OutboundFrame>,
        shutdown_rx: &mut watch::Receiver<bool>,
        open: &AtomicBool,
    ) -> SessionEnd {
        let connected = tokio::select! {
            result = connect_async(self.url.as_str()) => result,
            _ = shutdown_rx.changed() => return SessionEnd::Shutdown,
        };
        let ws_stream = match connected {
            Ok((ws_stream, _)) => ws_stream,
            Err(err) => {
                warn!(url = %self.url, %err, "control plane: failed to open websocket");
                return SessionEnd::Unreachable;
            }
        };
        info!(url = %self.url, "control plane: connected");
        open.store(true, Ordering::Release);
        if signals.send(ConnectionSignal::Connected).await.is_err() {
            return SessionEnd::Shutdown;
        }

        let (mut writer, mut reader) = ws_stream.split();
        loop {
            tokio::select! {
                msg = reader.next() => {
                    let parsed = match msg {
                        Some(Ok(Message::Text(text))) => InboundFrame::parse(&text),
                        Some(Ok(Message::Binary(bytes))) => InboundFrame::parse_bytes(&bytes),
                        Some(Ok(Message::Close(_))) | None => {
                            info!(url = %self.url, "control plane: channel closed by remote");
                            return SessionEnd::Closed;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(err)) => {
                            warn!(url = %self.url, %err, "control plane: websocket receive failed");
                            return SessionEnd::Closed;
                        }
                    };
                    match parsed {
                        Ok(frame) => {
                            if signals.send(ConnectionSignal::Frame(frame)).await.is_err() {
                                let _ = writer.send(Message::Close(None)).await;
                                return SessionEnd::Shutdown;
                            }
                        }
                        Err(err) => warn!(%err, "control plane: dropping malformed frame"),
                    }
                }
                Some(frame) = outbound_rx.recv() => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(%err, "control plane: failed to encode decision frame");
                            continue;
                        }
                    };
                    debug!(mnemonic = frame.mnemonic(), "control plane: sending decision frame");
                    if let Err(err) = writer.send(Message::Text(text)).await {
                        warn!(url = %self.url, %err, "control plane: websocket send failed");
                        return SessionEnd::Closed;
                    }
                }
                _ = shutdown_rx.changed() => {
                    let _ = writer.send(Message::Close(None)).await;
                    info!(url = %self.url, "control plane: channel torn down");
                    return SessionEnd::Shutdown;
                }
            }
        }
    }
}

/// Drops anything queued while the channel was closed.
fn discard_stale(outbound_rx: &mut mpsc::Receiver<OutboundFrame>) {
    while let Ok(frame) = outbound_rx.try_recv() {
        warn!(
            mnemonic = frame.mnemonic(),
            "control plane: discarding decision queued before connect"
        );
    }
}
