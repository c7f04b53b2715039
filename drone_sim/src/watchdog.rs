//! Watchdog actor: drains heartbeats, applies the timeout state machine,
//! and broadcasts warnings and the group shutdown.

use drone_core::{Escalation, Watchdog, WatchdogConfig};
use drone_env::{ArenaContext, PeerId, Supervision, SupervisionRx};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

/// What the watchdog observed over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WatchdogReport {
    /// Peers that crossed the warn threshold, with the time of the warning
    pub warned: Vec<(PeerId, Duration)>,

    /// Time of the kill decision, if one was made
    pub killed_at: Option<Duration>,

    /// Peer whose silence caused the kill
    pub culprit: Option<PeerId>,
}

impl WatchdogReport {
    pub fn killed(&self) -> bool {
        self.killed_at.is_some()
    }
}

/// Supervises `roster` until a kill, a shutdown broadcast, or until every
/// heartbeat handle has been dropped.
pub async fn run_watchdog<C: ArenaContext>(
    ctx: Arc<C>,
    roster: Vec<PeerId>,
    config: WatchdogConfig,
    mut heartbeats: mpsc::Receiver<PeerId>,
    supervision: broadcast::Sender<Supervision>,
) -> WatchdogReport {
    let mut shutdown = SupervisionRx::new(&supervision);
    let mut watchdog = Watchdog::new(&roster, config, ctx.now());
    let mut report = WatchdogReport::default();
    info!(
        peers = roster.len(),
        warn_after = ?config.warn_after,
        kill_after = ?config.kill_after,
        "watchdog started"
    );

    loop {
        let now = ctx.now();

        loop {
            match heartbeats.try_recv() {
                Ok(peer) => {
                    watchdog.heartbeat(peer, now);
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    info!("all supervised peers gone; watchdog exiting");
                    return report;
                }
            }
        }

        for escalation in watchdog.evaluate(now) {
            match escalation {
                Escalation::Warn { peer, silent_for } => {
                    warn!(peer = %peer, silent_for = ?silent_for, "peer missed its heartbeat deadline");
                    report.warned.push((peer, now));
                    let _ = supervision.send(Supervision::Warn(peer));
                }
                Escalation::Kill { peer, silent_for } => {
                    error!(peer = %peer, silent_for = ?silent_for, "peer unresponsive; shutting down the group");
                    report.killed_at = Some(now);
                    report.culprit = Some(peer);
                    let _ = supervision.send(Supervision::Shutdown);
                    return report;
                }
            }
        }

        tokio::select! {
            biased;
            msg = shutdown.next() => {
                if msg == Supervision::Shutdown {
                    info!("shutdown broadcast received; watchdog exiting");
                    return report;
                }
            }
            _ = ctx.sleep(config.poll_interval) => {}
        }
    }
}
