//! Batch spawners used by the generator agents.
//!
//! Targets are placed area-uniformly inside a central disk with rejection
//! sampling for a minimum spacing; obstacles are scattered uniformly over
//! the whole arena.

use crate::lifecycle::DEFAULT_LIFE_STEPS;
use crate::params::SimParams;
use crate::wire::{BatchEntry, EntityBatch, MAX_BATCH};
use rand::Rng;
use std::f64::consts::TAU;
use tracing::debug;

/// Target disk radius as a fraction of `world_half`.
pub const TARGET_RADIUS_FACTOR: f64 = 0.5;

/// Minimum target spacing as a fraction of `world_half`.
pub const TARGET_SPACING_FACTOR: f64 = 0.12;

/// Placement attempts per target before falling back.
pub const MAX_ATTEMPTS: usize = 50;

/// Parameters for target batches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetSpawnConfig {
    pub count: usize,
    pub max_radius: f64,
    pub min_spacing: f64,
    pub max_attempts: usize,
    pub life_steps: i32,
}

impl TargetSpawnConfig {
    pub fn from_params(params: &SimParams) -> Self {
        Self {
            count: MAX_BATCH,
            max_radius: params.world_half * TARGET_RADIUS_FACTOR,
            min_spacing: params.world_half * TARGET_SPACING_FACTOR,
            max_attempts: MAX_ATTEMPTS,
            life_steps: DEFAULT_LIFE_STEPS,
        }
    }
}

/// Parameters for obstacle batches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleSpawnConfig {
    pub count: usize,
    pub world_half: f64,
    pub life_steps: i32,
}

impl ObstacleSpawnConfig {
    pub fn from_params(params: &SimParams) -> Self {
        Self {
            count: MAX_BATCH,
            world_half: params.world_half,
            life_steps: DEFAULT_LIFE_STEPS,
        }
    }
}

/// A target batch plus which entries skipped the spacing check.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpawn {
    pub batch: EntityBatch,

    /// Indices placed by the unchecked fallback. The spacing guarantee does
    /// not hold for these.
    pub fallback: Vec<usize>,
}

fn sample_disk<R: Rng + ?Sized>(rng: &mut R, max_radius: f64) -> (f64, f64) {
    let theta = rng.gen_range(0.0..TAU);
    let u: f64 = rng.gen();
    let r = u.sqrt() * max_radius;
    (r * theta.cos(), r * theta.sin())
}

/// Spawns a target batch with rejection sampling.
///
/// Each target gets up to `max_attempts` candidates; a candidate is
/// accepted when it is at least `min_spacing` from every target already
/// placed in this batch. When the budget runs out the next sample is taken
/// unchecked and its index recorded in [`TargetSpawn::fallback`].
pub fn spawn_targets<R: Rng + ?Sized>(rng: &mut R, config: &TargetSpawnConfig) -> TargetSpawn {
    let count = config.count.min(MAX_BATCH);
    let min_spacing2 = config.min_spacing * config.min_spacing;
    let mut entries: Vec<BatchEntry> = Vec::with_capacity(count);
    let mut fallback = Vec::new();

    for index in 0..count {
        let mut placed = None;
        for _ in 0..config.max_attempts {
            let (x, y) = sample_disk(rng, config.max_radius);
            let clear = entries.iter().all(|e| {
                let (dx, dy) = (x - e.x, y - e.y);
                dx * dx + dy * dy >= min_spacing2
            });
            if clear {
                placed = Some((x, y));
                break;
            }
        }

        let (x, y) = match placed {
            Some(p) => p,
            None => {
                debug!(index, attempts = config.max_attempts, "target spacing budget exhausted, using fallback");
                fallback.push(index);
                sample_disk(rng, config.max_radius)
            }
        };

        entries.push(BatchEntry {
            x,
            y,
            life_steps: config.life_steps,
        });
    }

    TargetSpawn {
        batch: EntityBatch::new(entries),
        fallback,
    }
}

/// Spawns an obstacle batch uniformly over the arena. No spacing check.
pub fn spawn_obstacles<R: Rng + ?Sized>(rng: &mut R, config: &ObstacleSpawnConfig) -> EntityBatch {
    let wh = config.world_half;
    let entries = (0..config.count.min(MAX_BATCH))
        .map(|_| BatchEntry {
            x: rng.gen_range(-wh..=wh),
            y: rng.gen_range(-wh..=wh),
            life_steps: config.life_steps,
        })
        .collect();
    EntityBatch::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_targets_fall_back_when_arena_too_small() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = TargetSpawnConfig {
            count: 3,
            max_radius: 1.0,
            min_spacing: 10.0,
            max_attempts: MAX_ATTEMPTS,
            life_steps: DEFAULT_LIFE_STEPS,
        };

        let spawn = spawn_targets(&mut rng, &config);

        assert_eq!(spawn.batch.len(), 3);
        // The first target has nothing to collide with; the rest cannot fit
        assert_eq!(spawn.fallback, vec![1, 2]);
        for entry in &spawn.batch.entries {
            assert!((entry.x * entry.x + entry.y * entry.y).sqrt() <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_default_batch_is_full_and_alive() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let params = SimParams::default();
        let spawn = spawn_targets(&mut rng, &TargetSpawnConfig::from_params(&params));
        assert_eq!(spawn.batch.len(), MAX_BATCH);
        assert!(spawn.batch.entries.iter().all(|e| e.life_steps == DEFAULT_LIFE_STEPS));

        let obstacles = spawn_obstacles(&mut rng, &ObstacleSpawnConfig::from_params(&params));
        assert_eq!(obstacles.len(), MAX_BATCH);
    }

    #[test]
    fn test_same_seed_same_batch() {
        let config = TargetSpawnConfig::from_params(&SimParams::default());
        let a = spawn_targets(&mut ChaCha8Rng::seed_from_u64(3), &config);
        let b = spawn_targets(&mut ChaCha8Rng::seed_from_u64(3), &config);
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_checked_targets_respect_spacing(seed in any::<u64>(), world_half in 5.0f64..500.0) {
            let params = SimParams { world_half, ..SimParams::default() };
            let config = TargetSpawnConfig::from_params(&params);
            let spawn = spawn_targets(&mut ChaCha8Rng::seed_from_u64(seed), &config);
            let entries = &spawn.batch.entries;

            for i in 0..entries.len() {
                let ri = (entries[i].x.powi(2) + entries[i].y.powi(2)).sqrt();
                prop_assert!(ri <= config.max_radius * (1.0 + 1e-12));

                for j in 0..i {
                    if spawn.fallback.contains(&i) || spawn.fallback.contains(&j) {
                        continue;
                    }
                    let d = ((entries[i].x - entries[j].x).powi(2)
                        + (entries[i].y - entries[j].y).powi(2)).sqrt();
                    prop_assert!(d >= config.min_spacing * (1.0 - 1e-12));
                }
            }
        }

        #[test]
        fn prop_obstacles_inside_arena(seed in any::<u64>(), world_half in 1.0f64..500.0) {
            let config = ObstacleSpawnConfig { count: MAX_BATCH, world_half, life_steps: 10 };
            let batch = spawn_obstacles(&mut ChaCha8Rng::seed_from_u64(seed), &config);
            for e in &batch.entries {
                prop_assert!(e.x.abs() <= world_half && e.y.abs() <= world_half);
            }
        }
    }
}
