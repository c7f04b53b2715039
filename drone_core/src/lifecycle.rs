//! Entity lifecycle: slot storage, aging, expiry and target hits.
//!
//! Obstacles and targets live in two fixed-capacity slot collections owned
//! by [`EntityLifecycle`]. Generators deliver whole batches; the
//! coordinator ticks the lifecycle once per iteration, which ages every
//! active entity by one step and hit-tests the drone against the targets.
//!
//! # Invariants
//!
//! - `life_steps > 0` whenever `active`
//! - An entity goes inactive the tick its `life_steps` reaches 0, or the
//!   tick it is hit
//! - A target scores at most once

use crate::wire::{BatchEntry, EntityBatch, MAX_BATCH};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Lifetime of a freshly spawned entity, in coordinator ticks.
pub const DEFAULT_LIFE_STEPS: i32 = 1000;

/// Hit radius as a fraction of `world_half`.
pub const HIT_RADIUS_FACTOR: f64 = 0.08;

/// Kind of entity held in a slot collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle,
    Target,
}

/// An obstacle or target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// World position
    pub position: Vector2<f64>,

    /// Present in the arena
    pub active: bool,

    /// Coordinator ticks left before expiry
    pub life_steps: i32,
}

impl Entity {
    /// An empty, inactive slot.
    pub const EMPTY: Entity = Entity {
        position: Vector2::new(0.0, 0.0),
        active: false,
        life_steps: 0,
    };

    /// A live entity. Non-positive lifetimes produce an inactive slot.
    pub fn spawned(position: Vector2<f64>, life_steps: i32) -> Self {
        let life_steps = life_steps.max(0);
        Self {
            position,
            active: life_steps > 0,
            life_steps,
        }
    }

    fn from_entry(entry: &BatchEntry) -> Self {
        Self::spawned(Vector2::new(entry.x, entry.y), entry.life_steps)
    }

    /// Ages the entity by one step. Returns true if it expired.
    fn age(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.life_steps -= 1;
        if self.life_steps <= 0 {
            self.life_steps = 0;
            self.active = false;
            return true;
        }
        false
    }
}

/// Fixed-capacity, bounds-checked slot array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySlots {
    slots: [Entity; MAX_BATCH],
}

impl Default for EntitySlots {
    fn default() -> Self {
        Self {
            slots: [Entity::EMPTY; MAX_BATCH],
        }
    }
}

impl EntitySlots {
    pub const CAPACITY: usize = MAX_BATCH;

    /// Replaces the slots covered by the batch; slots past the batch keep
    /// their current content.
    pub fn apply_batch(&mut self, batch: &EntityBatch) -> usize {
        let covered = batch.entries.len().min(Self::CAPACITY);
        for (slot, entry) in self.slots.iter_mut().zip(&batch.entries) {
            *slot = Entity::from_entry(entry);
        }
        covered
    }

    /// Returns the entity in `index`, or `None` out of bounds.
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.slots.get(index)
    }

    /// All slots, active or not.
    pub fn as_slice(&self) -> &[Entity] {
        &self.slots
    }

    /// Iterator over active entities.
    pub fn active(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter(|e| e.active)
    }

    /// Ages every active entity. Returns the number that expired.
    fn age_all(&mut self) -> usize {
        let mut expired = 0;
        for entity in self.slots.iter_mut() {
            if entity.age() {
                expired += 1;
            }
        }
        expired
    }
}

/// What one lifecycle tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub expired_obstacles: usize,
    pub expired_targets: usize,

    /// Slot indices of targets hit this tick
    pub hits: Vec<usize>,
}

/// Owner of the obstacle and target collections plus the hit counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityLifecycle {
    obstacles: EntitySlots,
    targets: EntitySlots,
    hit_radius: f64,
    score: u32,
    targets_collected: u32,
    last_hit_tick: Option<u64>,
}

impl EntityLifecycle {
    /// Creates empty collections with the hit radius derived from `world_half`.
    pub fn new(world_half: f64) -> Self {
        Self {
            obstacles: EntitySlots::default(),
            targets: EntitySlots::default(),
            hit_radius: world_half * HIT_RADIUS_FACTOR,
            score: 0,
            targets_collected: 0,
            last_hit_tick: None,
        }
    }

    /// Installs a generator batch into the matching collection.
    pub fn apply_batch(&mut self, kind: EntityKind, batch: &EntityBatch) -> usize {
        match kind {
            EntityKind::Obstacle => self.obstacles.apply_batch(batch),
            EntityKind::Target => self.targets.apply_batch(batch),
        }
    }

    /// Advances one coordinator tick: age and expire everything, then
    /// hit-test the drone at `drone` against the surviving targets.
    pub fn tick(&mut self, drone: Vector2<f64>, tick_index: u64) -> TickOutcome {
        let mut outcome = TickOutcome {
            expired_obstacles: self.obstacles.age_all(),
            expired_targets: self.targets.age_all(),
            hits: Vec::new(),
        };

        let r2 = self.hit_radius * self.hit_radius;
        for (index, target) in self.targets.slots.iter_mut().enumerate() {
            if !target.active {
                continue;
            }
            if (drone - target.position).norm_squared() <= r2 {
                target.active = false;
                target.life_steps = 0;
                self.score += 1;
                self.targets_collected += 1;
                self.last_hit_tick = Some(tick_index);
                outcome.hits.push(index);
            }
        }

        outcome
    }

    pub fn obstacles(&self) -> &EntitySlots {
        &self.obstacles
    }

    pub fn targets(&self) -> &EntitySlots {
        &self.targets
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Targets taken out of the arena by a hit, as opposed to expiry.
    pub fn targets_collected(&self) -> u32 {
        self.targets_collected
    }

    /// Tick index of the most recent hit.
    pub fn last_hit_tick(&self) -> Option<u64> {
        self.last_hit_tick
    }
}
