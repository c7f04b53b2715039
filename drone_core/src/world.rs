//! The coordinator's authoritative world state and its key semantics.

use crate::keymap::KeyCommand;
use crate::lifecycle::{Entity, EntityLifecycle};
use crate::wire::{DroneState, ForceCommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of applying one key to the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyOutcome {
    /// Stop the coordinator
    Quit,

    /// Send this command to the integrator
    Send(ForceCommand),

    /// Directional key dropped because the world is paused
    Ignored,

    /// Nothing to send
    Unchanged,
}

/// Blackboard state owned by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// Key-driven commanded force
    pub force: ForceCommand,

    /// Latest drone state reported by the integrator
    pub drone: DroneState,

    pub paused: bool,
    pub score: u32,
    pub last_key: char,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            force: ForceCommand::default(),
            drone: DroneState::default(),
            paused: false,
            score: 0,
            last_key: '?',
        }
    }
}

impl WorldState {
    /// Applies one key press.
    ///
    /// - `q` quits
    /// - `p` toggles pause; entering pause zeroes the force and sends it
    /// - `R` zeroes the drone locally, sends a single reset command and unpauses
    /// - direction keys accumulate `force_step` steps, `d` brakes; both are
    ///   dropped while paused
    pub fn handle_key(&mut self, key: char, force_step: f64) -> KeyOutcome {
        self.last_key = key;

        match KeyCommand::from_key(key) {
            KeyCommand::Quit => {
                info!("quit requested");
                KeyOutcome::Quit
            }
            KeyCommand::Pause => {
                self.paused = !self.paused;
                info!(paused = self.paused, "pause toggled");
                if self.paused {
                    self.force = ForceCommand::default();
                    KeyOutcome::Send(self.force)
                } else {
                    KeyOutcome::Unchanged
                }
            }
            KeyCommand::Reset => {
                self.drone = DroneState::default();
                self.force = ForceCommand::default();
                self.paused = false;
                info!("reset requested");
                // The reset flag rides on this one command only
                KeyOutcome::Send(ForceCommand::reset())
            }
            cmd if self.paused => {
                debug!(key = %key, ?cmd, "key ignored while paused");
                KeyOutcome::Ignored
            }
            KeyCommand::Brake => {
                self.force = ForceCommand::default();
                info!(key = %key, fx = 0.0, fy = 0.0, "brake");
                KeyOutcome::Send(self.force)
            }
            KeyCommand::Thrust(dir) => {
                self.force.fx += dir.x * force_step;
                self.force.fy += dir.y * force_step;
                self.force.reset = false;
                info!(key = %key, dfx = dir.x, dfy = dir.y, fx = self.force.fx, fy = self.force.fy, "force updated");
                KeyOutcome::Send(self.force)
            }
            KeyCommand::Unbound => KeyOutcome::Unchanged,
        }
    }
}

/// Read-only view of the world handed to renderers once per iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub world: WorldState,

    /// Command last sent to the integrator (key force plus field force)
    pub command: ForceCommand,

    pub obstacles: Vec<Entity>,
    pub targets: Vec<Entity>,

    /// Coordinator iterations so far
    pub tick: u64,

    pub targets_collected: u32,
    pub last_hit_tick: Option<u64>,
}

impl WorldSnapshot {
    pub fn capture(world: &WorldState, command: ForceCommand, lifecycle: &EntityLifecycle, tick: u64) -> Self {
        Self {
            world: world.clone(),
            command,
            obstacles: lifecycle.obstacles().active().copied().collect(),
            targets: lifecycle.targets().active().copied().collect(),
            tick,
            targets_collected: lifecycle.targets_collected(),
            last_hit_tick: lifecycle.last_hit_tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thrust_accumulates() {
        let mut world = WorldState::default();
        world.handle_key('f', 2.0);
        let out = world.handle_key('f', 2.0);
        assert_eq!(out, KeyOutcome::Send(ForceCommand::new(4.0, 0.0)));

        let out = world.handle_key('r', 2.0);
        assert_eq!(out, KeyOutcome::Send(ForceCommand::new(6.0, 2.0)));
        assert_eq!(world.last_key, 'r');
    }

    #[test]
    fn test_brake_zeroes_force() {
        let mut world = WorldState::default();
        world.handle_key('e', 1.0);
        assert_eq!(world.handle_key('d', 1.0), KeyOutcome::Send(ForceCommand::default()));
        assert_eq!(world.force, ForceCommand::default());
    }

    #[test]
    fn test_pause_zeroes_and_blocks_keys() {
        let mut world = WorldState::default();
        world.handle_key('c', 1.0);

        let out = world.handle_key('p', 1.0);
        assert_eq!(out, KeyOutcome::Send(ForceCommand::default()));
        assert!(world.paused);

        assert_eq!(world.handle_key('f', 1.0), KeyOutcome::Ignored);
        assert_eq!(world.handle_key('d', 1.0), KeyOutcome::Ignored);
        assert_eq!(world.force, ForceCommand::default());

        // Leaving pause sends nothing
        assert_eq!(world.handle_key('p', 1.0), KeyOutcome::Unchanged);
        assert!(!world.paused);
    }

    #[test]
    fn test_reset_sends_flag_once_and_unpauses() {
        let mut world = WorldState {
            drone: DroneState::new(5.0, 5.0, 3.0, 3.0),
            paused: true,
            ..WorldState::default()
        };

        let out = world.handle_key('R', 1.0);
        assert_eq!(out, KeyOutcome::Send(ForceCommand::reset()));
        assert_eq!(world.drone, DroneState::default());
        assert!(!world.paused);
        assert!(!world.force.reset);

        // The next command no longer carries the flag
        match world.handle_key('f', 1.0) {
            KeyOutcome::Send(cmd) => assert!(!cmd.reset),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_quit_and_unbound() {
        let mut world = WorldState::default();
        assert_eq!(world.handle_key('z', 1.0), KeyOutcome::Unchanged);
        assert_eq!(world.handle_key('q', 1.0), KeyOutcome::Quit);
        assert_eq!(world.last_key, 'q');
    }
}
