//! Fixed-step point-mass integrator.
//!
//! Semi-implicit Euler with linear drag:
//!
//! ```text
//! a  = (F - K·v) / M
//! v' = v + a·dt
//! x' = x + v'·dt
//! ```
//!
//! No clamping of force, velocity or position. Every operation is a plain
//! `f64` op in a fixed order, so identical inputs give bit-identical
//! trajectories.

use crate::params::SimParams;
use crate::wire::{DroneState, ForceCommand};

/// Drone kinematics plus the command currently in force.
#[derive(Debug, Clone)]
pub struct Integrator {
    mass: f64,
    visc: f64,
    dt: f64,
    state: DroneState,
    command: ForceCommand,
    steps: u64,
}

impl Integrator {
    /// Creates an integrator at rest at the origin with zero force.
    pub fn new(params: &SimParams) -> Self {
        Self {
            mass: params.mass,
            visc: params.visc,
            dt: params.dt,
            state: DroneState::default(),
            command: ForceCommand::default(),
            steps: 0,
        }
    }

    /// Installs a new command.
    ///
    /// A command with `reset` zeroes the state immediately; the flag itself
    /// is not retained, so the reset applies to this tick only.
    pub fn apply(&mut self, command: ForceCommand) {
        if command.reset {
            self.state = DroneState::default();
        }
        self.command = ForceCommand {
            reset: false,
            ..command
        };
    }

    /// Advances one timestep under the current command and returns the new state.
    pub fn step(&mut self) -> DroneState {
        let (m, k, dt) = (self.mass, self.visc, self.dt);
        let s = &mut self.state;

        let ax = (self.command.fx - k * s.vx) / m;
        let ay = (self.command.fy - k * s.vy) / m;

        s.vx += ax * dt;
        s.vy += ay * dt;

        s.x += s.vx * dt;
        s.y += s.vy * dt;

        self.steps += 1;
        *s
    }

    pub fn state(&self) -> DroneState {
        self.state
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn params(mass: f64, visc: f64, dt: f64) -> SimParams {
        SimParams {
            mass,
            visc,
            dt,
            ..SimParams::default()
        }
    }

    #[test]
    fn test_constant_force_no_drag() {
        let mut integ = Integrator::new(&params(1.0, 0.0, 1.0));
        integ.apply(ForceCommand::new(1.0, 0.0));

        let s1 = integ.step();
        assert_eq!((s1.vx, s1.vy, s1.x, s1.y), (1.0, 0.0, 1.0, 0.0));

        // Dropping the force leaves the velocity unchanged without drag
        integ.apply(ForceCommand::new(0.0, 0.0));
        let s2 = integ.step();
        assert_eq!((s2.vx, s2.x), (1.0, 2.0));
    }

    #[test]
    fn test_force_persists_without_new_command() {
        // No new command: the last one stays in force, so with K = M = dt = 1
        // the drag exactly cancels it on the second tick
        let mut integ = Integrator::new(&params(1.0, 1.0, 1.0));
        integ.apply(ForceCommand::new(1.0, 0.0));

        let s1 = integ.step();
        assert_eq!((s1.vx, s1.x), (1.0, 1.0));

        let s2 = integ.step();
        assert_eq!((s2.vx, s2.x), (1.0, 2.0));
    }

    #[test]
    fn test_reset_mid_flight() {
        let mut integ = Integrator::new(&params(1.0, 1.0, 0.1));
        integ.state = DroneState::new(5.0, 5.0, 3.0, 3.0);

        integ.apply(ForceCommand::reset());
        assert_eq!(integ.state(), DroneState::default());
        assert!(!integ.command.reset);

        let s = integ.step();
        assert_eq!(s, DroneState::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_drag_decays_velocity() {
        let mut integ = Integrator::new(&params(2.0, 0.5, 0.1));
        integ.state = DroneState::new(0.0, 0.0, 10.0, -10.0);
        let s = integ.step();
        // a = -0.5 * 10 / 2 = -2.5 → v = 10 - 0.25
        assert_relative_eq!(s.vx, 9.75);
        assert_relative_eq!(s.vy, -9.75);
        assert_relative_eq!(s.x, 0.975, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn prop_matches_discrete_law(
            mass in 0.1f64..10.0,
            visc in 0.0f64..5.0,
            dt in 0.001f64..0.5,
            forces in prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 1..40),
        ) {
            let mut integ = Integrator::new(&params(mass, visc, dt));
            let (mut x, mut y, mut vx, mut vy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);

            for (fx, fy) in forces {
                integ.apply(ForceCommand::new(fx, fy));
                let s = integ.step();

                vx += dt * ((fx - visc * vx) / mass);
                vy += dt * ((fy - visc * vy) / mass);
                x += dt * vx;
                y += dt * vy;

                // Bit-for-bit, not approximately
                prop_assert_eq!(s.vx.to_bits(), vx.to_bits());
                prop_assert_eq!(s.vy.to_bits(), vy.to_bits());
                prop_assert_eq!(s.x.to_bits(), x.to_bits());
                prop_assert_eq!(s.y.to_bits(), y.to_bits());
            }
        }

        #[test]
        fn prop_runs_are_reproducible(
            forces in prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 1..20),
        ) {
            let p = params(1.3, 0.7, 0.05);
            let mut a = Integrator::new(&p);
            let mut b = Integrator::new(&p);
            for (fx, fy) in forces {
                a.apply(ForceCommand::new(fx, fy));
                b.apply(ForceCommand::new(fx, fy));
                prop_assert_eq!(a.step(), b.step());
            }
        }
    }
}
