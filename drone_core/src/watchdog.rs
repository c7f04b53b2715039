//! Heartbeat-timeout state machine.
//!
//! Each supervised peer moves `Alive → Warned → Dead`. A heartbeat brings a
//! warned peer back to `Alive`; `Dead` is terminal. The state machine is
//! clock-agnostic: callers pass the current time, so the same code runs
//! against the wall clock and against a virtual one.

use drone_env::PeerId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Invalid watchdog thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("kill threshold ({kill_after:?}) must exceed warn threshold ({warn_after:?})")]
pub struct ThresholdError {
    pub warn_after: Duration,
    pub kill_after: Duration,
}

/// Watchdog timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Silence before an advisory warning
    pub warn_after: Duration,

    /// Silence before the whole group is shut down
    pub kill_after: Duration,

    /// How often the watchdog re-evaluates
    pub poll_interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            warn_after: Duration::from_secs(5),
            kill_after: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl WatchdogConfig {
    pub fn from_secs(warn_secs: u64, kill_secs: u64) -> Result<Self, ThresholdError> {
        let config = Self {
            warn_after: Duration::from_secs(warn_secs),
            kill_after: Duration::from_secs(kill_secs),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.kill_after <= self.warn_after {
            return Err(ThresholdError {
                warn_after: self.warn_after,
                kill_after: self.kill_after,
            });
        }
        Ok(())
    }
}

/// Liveness of one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Liveness {
    Alive,
    Warned,
    Dead,
}

/// Per-peer heartbeat bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PeerRecord {
    id: PeerId,
    last_seen: Duration,
    state: Liveness,
}

/// A transition the caller must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Advisory: the peer crossed the warn threshold
    Warn { peer: PeerId, silent_for: Duration },

    /// Fatal: the peer crossed the kill threshold
    Kill { peer: PeerId, silent_for: Duration },
}

/// Heartbeat records for a fixed roster.
#[derive(Debug, Clone)]
pub struct Watchdog {
    config: WatchdogConfig,
    records: Vec<PeerRecord>,
}

impl Watchdog {
    /// Starts supervising `roster`, counting every peer as seen at `now`.
    pub fn new(roster: &[PeerId], config: WatchdogConfig, now: Duration) -> Self {
        let mut records: Vec<PeerRecord> = roster
            .iter()
            .map(|&id| PeerRecord {
                id,
                last_seen: now,
                state: Liveness::Alive,
            })
            .collect();
        records.sort_by_key(|r| r.id);
        records.dedup_by_key(|r| r.id);
        Self { config, records }
    }

    /// Records a heartbeat. Returns false for unknown or dead peers.
    pub fn heartbeat(&mut self, peer: PeerId, now: Duration) -> bool {
        match self.records.iter_mut().find(|r| r.id == peer) {
            Some(record) if record.state != Liveness::Dead => {
                record.last_seen = now;
                record.state = Liveness::Alive;
                true
            }
            _ => false,
        }
    }

    /// Applies the thresholds at time `now` and returns new transitions.
    ///
    /// A peer silent past both thresholds in one evaluation yields its
    /// `Warn` before its `Kill`, keeping the state sequence monotonic.
    pub fn evaluate(&mut self, now: Duration) -> Vec<Escalation> {
        let mut escalations = Vec::new();
        for record in &mut self.records {
            let silent_for = now.saturating_sub(record.last_seen);

            if record.state == Liveness::Alive && silent_for >= self.config.warn_after {
                record.state = Liveness::Warned;
                escalations.push(Escalation::Warn {
                    peer: record.id,
                    silent_for,
                });
            }
            if record.state == Liveness::Warned && silent_for >= self.config.kill_after {
                record.state = Liveness::Dead;
                escalations.push(Escalation::Kill {
                    peer: record.id,
                    silent_for,
                });
            }
        }
        escalations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Watchdog {
        fn record(&self, peer: PeerId) -> Option<&PeerRecord> {
            self.records.iter().find(|r| r.id == peer)
        }

        fn any_dead(&self) -> bool {
            self.records.iter().any(|r| r.state == Liveness::Dead)
        }
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn watchdog(roster: &[PeerId]) -> Watchdog {
        Watchdog::new(roster, WatchdogConfig::from_secs(5, 10).unwrap(), Duration::ZERO)
    }

    #[test]
    fn test_silent_peer_warns_then_dies() {
        let mut wd = watchdog(&[PeerId::Integrator]);

        assert!(wd.evaluate(secs(4.9)).is_empty());
        assert_eq!(
            wd.evaluate(secs(5.0)),
            vec![Escalation::Warn { peer: PeerId::Integrator, silent_for: secs(5.0) }]
        );
        assert_eq!(wd.record(PeerId::Integrator).unwrap().state, Liveness::Warned);

        assert!(wd.evaluate(secs(9.9)).is_empty());
        assert_eq!(
            wd.evaluate(secs(10.0)),
            vec![Escalation::Kill { peer: PeerId::Integrator, silent_for: secs(10.0) }]
        );
        assert!(wd.any_dead());
    }

    #[test]
    fn test_heartbeat_returns_peer_to_alive() {
        let mut wd = watchdog(&[PeerId::Input]);
        wd.evaluate(secs(6.0));
        assert_eq!(wd.record(PeerId::Input).unwrap().state, Liveness::Warned);

        assert!(wd.heartbeat(PeerId::Input, secs(7.0)));
        assert_eq!(wd.record(PeerId::Input).unwrap().state, Liveness::Alive);

        // Elapsed time restarts from the heartbeat
        assert!(wd.evaluate(secs(11.0)).is_empty());
        assert_eq!(wd.evaluate(secs(12.0)).len(), 1);
    }

    #[test]
    fn test_late_evaluation_warns_before_kill() {
        let mut wd = watchdog(&[PeerId::TargetGen]);
        let out = wd.evaluate(secs(30.0));
        assert!(matches!(out[0], Escalation::Warn { .. }));
        assert!(matches!(out[1], Escalation::Kill { .. }));
    }

    #[test]
    fn test_dead_is_terminal() {
        let mut wd = watchdog(&[PeerId::ObstacleGen]);
        wd.evaluate(secs(10.0));
        assert!(!wd.heartbeat(PeerId::ObstacleGen, secs(11.0)));
        assert_eq!(wd.record(PeerId::ObstacleGen).unwrap().state, Liveness::Dead);
        assert!(wd.evaluate(secs(20.0)).is_empty());
    }

    #[test]
    fn test_only_silent_peers_escalate() {
        let mut wd = watchdog(&PeerId::ROSTER);
        for peer in PeerId::ROSTER {
            if peer != PeerId::Coordinator {
                wd.heartbeat(peer, secs(4.0));
            }
        }
        let out = wd.evaluate(secs(5.0));
        assert_eq!(out, vec![Escalation::Warn { peer: PeerId::Coordinator, silent_for: secs(5.0) }]);
        assert!(wd.heartbeat(PeerId::Coordinator, secs(5.0)));
    }

    #[test]
    fn test_thresholds_validated() {
        assert!(WatchdogConfig::from_secs(10, 5).is_err());
        assert!(WatchdogConfig::from_secs(5, 5).is_err());
    }
}
