//! Heartbeats and the supervision broadcast.
//!
//! Every supervised actor owns a [`Heartbeat`] and beats at least once per
//! loop iteration. The watchdog drains the heartbeat queue and answers
//! through a [`Supervision`] broadcast that all actors subscribe to.

use crate::types::PeerId;
use tokio::sync::{broadcast, mpsc};

/// Notification broadcast to every actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supervision {
    /// A peer missed its warning deadline (advisory)
    Warn(PeerId),

    /// Stop cooperatively: close outbound links and exit
    Shutdown,
}

/// Creates the heartbeat queue shared by all supervised actors.
///
/// The hub hands out per-peer [`Heartbeat`] handles. Once the hub and every
/// handle are dropped the receiver observes end-of-stream.
pub fn heartbeat_channel(capacity: usize) -> (HeartbeatHub, mpsc::Receiver<PeerId>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (HeartbeatHub { tx }, rx)
}

/// Factory for heartbeat handles.
pub struct HeartbeatHub {
    tx: mpsc::Sender<PeerId>,
}

impl HeartbeatHub {
    /// Registers a peer and returns its heartbeat handle.
    pub fn register(&self, peer: PeerId) -> Heartbeat {
        Heartbeat {
            peer,
            tx: self.tx.clone(),
        }
    }
}

/// Liveness signal owned by one actor.
#[derive(Clone)]
pub struct Heartbeat {
    peer: PeerId,
    tx: mpsc::Sender<PeerId>,
}

impl Heartbeat {
    /// Signals liveness without blocking.
    ///
    /// A full queue drops the beat; the next one carries the same
    /// information.
    pub fn beat(&self) {
        let _ = self.tx.try_send(self.peer);
    }

    /// Returns the peer this handle beats for.
    pub fn peer(&self) -> PeerId {
        self.peer
    }
}

/// Creates the supervision broadcast sender.
pub fn supervision_channel() -> broadcast::Sender<Supervision> {
    let (tx, _) = broadcast::channel(32);
    tx
}

/// Receiving side of the supervision broadcast.
///
/// Hides lag and sender shutdown: a closed broadcast simply never yields
/// again, so actors can keep it in a `select!` unconditionally.
pub struct SupervisionRx {
    rx: broadcast::Receiver<Supervision>,
    closed: bool,
}

impl SupervisionRx {
    /// Subscribes to a supervision broadcast.
    pub fn new(tx: &broadcast::Sender<Supervision>) -> Self {
        Self {
            rx: tx.subscribe(),
            closed: false,
        }
    }

    /// Waits for the next notification.
    pub async fn next(&mut self) -> Supervision {
        loop {
            if self.closed {
                return std::future::pending().await;
            }
            match self.rx.recv().await {
                Ok(msg) => return msg,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "supervision receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => self.closed = true,
            }
        }
    }

    /// Returns the next pending notification, if any.
    pub fn try_next(&mut self) -> Option<Supervision> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Returns true if a shutdown is pending, consuming notifications up to it.
    pub fn shutdown_requested(&mut self) -> bool {
        while let Some(msg) = self.try_next() {
            if msg == Supervision::Shutdown {
                return true;
            }
        }
        false
    }
}
