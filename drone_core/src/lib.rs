//! Drone Arena Core - simulation engines
//!
//! Pure, synchronous building blocks for the arena:
//! 1. **Integrator**: fixed-step point-mass dynamics with linear drag
//! 2. **ForceField**: wall and obstacle repulsion
//! 3. **EntityLifecycle**: obstacle/target slots, aging, expiry, hit scoring
//! 4. **Watchdog**: heartbeat-timeout escalation
//!
//! Plus the fixed-size wire records the actors exchange and the parameter
//! set they share. Nothing here awaits or spawns; the actors in `drone_sim`
//! drive these engines.

pub mod force_field;
pub mod integrator;
pub mod keymap;
pub mod lifecycle;
pub mod params;
pub mod spawn;
pub mod watchdog;
pub mod wire;
pub mod world;

// Re-export key types for convenience
pub use force_field::{FieldSources, ForceField};
pub use integrator::Integrator;
pub use keymap::KeyCommand;
pub use lifecycle::{Entity, EntityKind, EntityLifecycle, EntitySlots, TickOutcome};
pub use params::{ConfigError, SimParams};
pub use spawn::{spawn_obstacles, spawn_targets, ObstacleSpawnConfig, TargetSpawn, TargetSpawnConfig};
pub use watchdog::{Escalation, Watchdog, WatchdogConfig};
pub use wire::{DroneState, EntityBatch, ForceCommand, KeyEvent, ObstacleBatch, TargetBatch};
pub use world::{KeyOutcome, WorldSnapshot, WorldState};
