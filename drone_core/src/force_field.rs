//! Repulsive force field from the arena walls and active obstacles.
//!
//! Both sources use the same potential-field magnitude
//! `gain * (1/d - 1/clearance)`, clamped at zero and applied only inside the
//! clearance band. Distances are floored at [`MIN_DISTANCE`] so a drone
//! sitting on a wall or an obstacle gets a large but finite push.

use crate::lifecycle::Entity;
use crate::params::SimParams;
use nalgebra::Vector2;

/// Distance floor guarding the `1/d` terms.
pub const MIN_DISTANCE: f64 = 1e-3;

/// Obstacle clearance as a fraction of `world_half`.
pub const OBSTACLE_CLEARANCE_FACTOR: f64 = 0.30;

/// Obstacle repulsion gain.
pub const OBSTACLE_GAIN: f64 = 120.0;

/// Which sources contribute to [`ForceField::total`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSources {
    pub walls: bool,
    pub obstacles: bool,
}

impl Default for FieldSources {
    fn default() -> Self {
        Self {
            walls: false,
            obstacles: true,
        }
    }
}

/// Pure repulsion calculator. Holds only constants derived from the params.
#[derive(Debug, Clone, Copy)]
pub struct ForceField {
    world_half: f64,
    wall_clearance: f64,
    wall_gain: f64,
    obs_clearance: f64,
    obs_gain: f64,
}

fn repulsion(gain: f64, d: f64, clearance: f64) -> f64 {
    let d = d.max(MIN_DISTANCE);
    (gain * (1.0 / d - 1.0 / clearance)).max(0.0)
}

impl ForceField {
    pub fn new(params: &SimParams) -> Self {
        Self {
            world_half: params.world_half,
            wall_clearance: params.wall_clearance,
            wall_gain: params.wall_gain,
            obs_clearance: params.world_half * OBSTACLE_CLEARANCE_FACTOR,
            obs_gain: OBSTACLE_GAIN,
        }
    }

    /// Sum of the four wall contributions at `pos`.
    ///
    /// Each wall pushes along its inward normal when the drone is closer
    /// than `wall_clearance`.
    pub fn wall_force(&self, pos: Vector2<f64>) -> Vector2<f64> {
        let mut force = Vector2::zeros();
        if self.wall_clearance <= 0.0 || self.wall_gain <= 0.0 {
            return force;
        }

        // (distance to wall, inward normal)
        let walls = [
            (self.world_half - pos.x, Vector2::new(-1.0, 0.0)), // right
            (self.world_half + pos.x, Vector2::new(1.0, 0.0)),  // left
            (self.world_half - pos.y, Vector2::new(0.0, -1.0)), // top
            (self.world_half + pos.y, Vector2::new(0.0, 1.0)),  // bottom
        ];

        for (d, normal) in walls {
            if d < self.wall_clearance {
                force += normal * repulsion(self.wall_gain, d, self.wall_clearance);
            }
        }
        force
    }

    /// Sum of the contributions of every active obstacle within clearance.
    ///
    /// Each obstacle pushes along the unit vector from the obstacle to the
    /// drone.
    pub fn obstacle_force(&self, pos: Vector2<f64>, obstacles: &[Entity]) -> Vector2<f64> {
        let mut force = Vector2::zeros();
        if self.obs_clearance <= 0.0 || self.obs_gain <= 0.0 {
            return force;
        }

        for obstacle in obstacles.iter().filter(|o| o.active) {
            let delta = pos - obstacle.position;
            let rho = delta.norm().max(MIN_DISTANCE);
            if rho < self.obs_clearance {
                let mag = repulsion(self.obs_gain, rho, self.obs_clearance);
                force += (delta / rho) * mag;
            }
        }
        force
    }

    /// Vector sum of the enabled sources. No normalization.
    pub fn total(&self, pos: Vector2<f64>, obstacles: &[Entity], sources: FieldSources) -> Vector2<f64> {
        let mut force = Vector2::zeros();
        if sources.walls {
            force += self.wall_force(pos);
        }
        if sources.obstacles {
            force += self.obstacle_force(pos, obstacles);
        }
        force
    }
}
