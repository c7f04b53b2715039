//! Common types for the arena environment abstraction.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Identifier of a supervised peer.
///
/// The arena runs a fixed set of actors, so peers are named rather than
/// allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeerId {
    /// Central state owner and event multiplexer
    Coordinator,

    /// Raw key input capture
    Input,

    /// Fixed-step physics
    Integrator,

    /// Obstacle batch generator
    ObstacleGen,

    /// Target batch generator
    TargetGen,
}

impl PeerId {
    /// Every peer the watchdog supervises by default.
    pub const ROSTER: [PeerId; 5] = [
        PeerId::Coordinator,
        PeerId::Input,
        PeerId::Integrator,
        PeerId::ObstacleGen,
        PeerId::TargetGen,
    ];

    /// Returns the short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            PeerId::Coordinator => "coordinator",
            PeerId::Input => "input",
            PeerId::Integrator => "integrator",
            PeerId::ObstacleGen => "obstacle_gen",
            PeerId::TargetGen => "target_gen",
        }
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fixed-size binary record exchanged over a link.
///
/// Message boundaries are implied by `SIZE`; there are no delimiters.
pub trait WireRecord: Sized + Send + 'static {
    /// Record name (for logging)
    const NAME: &'static str;

    /// Encoded length in bytes
    const SIZE: usize;

    /// Encodes the record into exactly `SIZE` bytes.
    fn encode(&self) -> Vec<u8>;

    /// Decodes a record, rejecting anything that is not exactly `SIZE` bytes.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError>;
}

/// Checks a buffer against a record size.
pub fn expect_len(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    if bytes.len() != expected {
        return Err(DecodeError::Length {
            expected,
            got: bytes.len(),
        });
    }
    Ok(())
}
