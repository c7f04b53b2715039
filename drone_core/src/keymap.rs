//! Key bindings for the 3x3 command cluster.
//!
//! ```text
//!   w e r        ↖ ↑ ↗
//!   s d f        ← ■ →      d = brake
//!   x c v        ↙ ↓ ↘
//! ```
//!
//! Plus `p` (pause toggle), `R` (reset) and `q` (quit).

use nalgebra::Vector2;

/// What a key asks the coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyCommand {
    /// Graceful shutdown
    Quit,

    /// Toggle pause
    Pause,

    /// Zero the drone state and forces
    Reset,

    /// Zero the commanded force
    Brake,

    /// Add `direction * force_step` to the commanded force
    Thrust(Vector2<f64>),

    /// Not bound to anything
    Unbound,
}

impl KeyCommand {
    /// Maps a raw key to its command.
    ///
    /// Diagonal keys step both axes by one unit, so a diagonal press adds
    /// `force_step` to each component.
    pub fn from_key(key: char) -> Self {
        let thrust = |x: f64, y: f64| KeyCommand::Thrust(Vector2::new(x, y));
        match key {
            'q' => KeyCommand::Quit,
            'p' => KeyCommand::Pause,
            'R' => KeyCommand::Reset,
            'd' => KeyCommand::Brake,

            'w' => thrust(-1.0, 1.0),
            'e' => thrust(0.0, 1.0),
            'r' => thrust(1.0, 1.0),

            's' => thrust(-1.0, 0.0),
            'f' => thrust(1.0, 0.0),

            'x' => thrust(-1.0, -1.0),
            'c' => thrust(0.0, -1.0),
            'v' => thrust(1.0, -1.0),

            _ => KeyCommand::Unbound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_directions() {
        assert_eq!(KeyCommand::from_key('e'), KeyCommand::Thrust(Vector2::new(0.0, 1.0)));
        assert_eq!(KeyCommand::from_key('s'), KeyCommand::Thrust(Vector2::new(-1.0, 0.0)));
        assert_eq!(KeyCommand::from_key('v'), KeyCommand::Thrust(Vector2::new(1.0, -1.0)));
    }

    #[test]
    fn test_control_keys() {
        assert_eq!(KeyCommand::from_key('q'), KeyCommand::Quit);
        assert_eq!(KeyCommand::from_key('p'), KeyCommand::Pause);
        assert_eq!(KeyCommand::from_key('R'), KeyCommand::Reset);
        // Lowercase r is a thrust key, not reset
        assert_eq!(KeyCommand::from_key('r'), KeyCommand::Thrust(Vector2::new(1.0, 1.0)));
        assert_eq!(KeyCommand::from_key('d'), KeyCommand::Brake);
        assert_eq!(KeyCommand::from_key('z'), KeyCommand::Unbound);
    }
}
