//! Simulation parameters and their loading.
//!
//! Parameters are loaded once at startup and copied by value into every
//! actor that needs them. They never change afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur when loading parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The parameter file exists but could not be read.
    #[error("failed to read params file: {0}")]
    Io(#[from] std::io::Error),

    /// The parameter file is not valid JSON for [`SimParams`].
    #[error("failed to parse params file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A parameter is outside its valid range.
    #[error("invalid parameter: {0}")]
    Invalid(String),
}

/// Physical and arena parameters.
///
/// The arena spans `x, y ∈ [-world_half, +world_half]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// M: mass of the drone
    pub mass: f64,

    /// K: viscous friction coefficient
    pub visc: f64,

    /// Integration timestep in seconds
    pub dt: f64,

    /// Force increment per directional key
    pub force_step: f64,

    /// Half the side length of the square arena
    pub world_half: f64,

    /// Distance from a wall where repulsion starts
    pub wall_clearance: f64,

    /// Strength of wall repulsion
    pub wall_gain: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            visc: 1.0,
            dt: 0.05,
            force_step: 1.0,
            world_half: 100.0,
            wall_clearance: 5.0,
            wall_gain: 10.0,
        }
    }
}

impl SimParams {
    /// Loads parameters from a JSON file.
    ///
    /// A missing file is not an error: defaults are returned and a warning
    /// is logged. Fields absent from the file keep their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "params file not found, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)?;
        let params = Self::from_json(&text)?;
        info!(path = %path.display(), ?params, "loaded params");
        Ok(params)
    }

    /// Parses and validates parameters from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let params: SimParams = serde_json::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks the values the integrator and the arena depend on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("mass", self.mass),
            ("dt", self.dt),
            ("world_half", self.world_half),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        if self.visc < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "visc must not be negative, got {}",
                self.visc
            )));
        }
        Ok(())
    }

    /// Integration timestep as a `Duration`.
    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.dt)
    }
}
