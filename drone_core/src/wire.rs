//! Fixed-layout binary records exchanged between actors.
//!
//! All records are little-endian with no padding and no delimiters; the
//! record size alone marks message boundaries.
//!
//! | Record | Layout | Bytes |
//! |---|---|---|
//! | `KeyEvent` | `key: u8` | 1 |
//! | `ForceCommand` | `fx: f64, fy: f64, reset: i32` | 20 |
//! | `DroneState` | `x, y, vx, vy: f64` | 32 |
//! | `ObstacleBatch` / `TargetBatch` | `count: i32, 8 × (x: f64, y: f64, life_steps: i32)` | 164 |

use drone_env::{expect_len, WireRecord};
use serde::{Deserialize, Serialize};

pub use drone_env::DecodeError;

/// Maximum number of entities in one batch (and in each slot collection).
pub const MAX_BATCH: usize = 8;

const ENTRY_SIZE: usize = 8 + 8 + 4;

fn read_f64(bytes: &[u8], offset: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    f64::from_le_bytes(buf)
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(buf)
}

/// One key press from the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: u8,
}

impl KeyEvent {
    pub fn new(key: u8) -> Self {
        Self { key }
    }

    pub fn as_char(&self) -> char {
        self.key as char
    }
}

impl WireRecord for KeyEvent {
    const NAME: &'static str = "KeyEvent";
    const SIZE: usize = 1;

    fn encode(&self) -> Vec<u8> {
        vec![self.key]
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        expect_len(bytes, Self::SIZE)?;
        Ok(Self { key: bytes[0] })
    }
}

/// Commanded force sent from the coordinator to the integrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceCommand {
    /// Total commanded force in x
    pub fx: f64,

    /// Total commanded force in y
    pub fy: f64,

    /// Zero the integrator state before the next step
    pub reset: bool,
}

impl ForceCommand {
    pub fn new(fx: f64, fy: f64) -> Self {
        Self { fx, fy, reset: false }
    }

    /// A zero-force command that also resets the integrator.
    pub fn reset() -> Self {
        Self {
            fx: 0.0,
            fy: 0.0,
            reset: true,
        }
    }
}

impl WireRecord for ForceCommand {
    const NAME: &'static str = "ForceCommand";
    const SIZE: usize = 20;

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.fx.to_le_bytes());
        out.extend_from_slice(&self.fy.to_le_bytes());
        out.extend_from_slice(&(self.reset as i32).to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        expect_len(bytes, Self::SIZE)?;
        Ok(Self {
            fx: read_f64(bytes, 0),
            fy: read_f64(bytes, 8),
            reset: read_i32(bytes, 16) != 0,
        })
    }
}

/// Drone kinematic state published by the integrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DroneState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl DroneState {
    pub fn new(x: f64, y: f64, vx: f64, vy: f64) -> Self {
        Self { x, y, vx, vy }
    }

    /// Position as a vector.
    pub fn position(&self) -> nalgebra::Vector2<f64> {
        nalgebra::Vector2::new(self.x, self.y)
    }
}

impl WireRecord for DroneState {
    const NAME: &'static str = "DroneState";
    const SIZE: usize = 32;

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        for v in [self.x, self.y, self.vx, self.vy] {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        expect_len(bytes, Self::SIZE)?;
        Ok(Self {
            x: read_f64(bytes, 0),
            y: read_f64(bytes, 8),
            vx: read_f64(bytes, 16),
            vy: read_f64(bytes, 24),
        })
    }
}

/// One spawned entity as carried in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub x: f64,
    pub y: f64,
    pub life_steps: i32,
}

/// A generator batch: up to [`MAX_BATCH`] entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityBatch {
    pub entries: Vec<BatchEntry>,
}

impl EntityBatch {
    /// Encoded size shared by both batch records.
    pub const SIZE: usize = 4 + MAX_BATCH * ENTRY_SIZE;

    pub fn new(mut entries: Vec<BatchEntry>) -> Self {
        entries.truncate(MAX_BATCH);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        let count = self.entries.len().min(MAX_BATCH);
        out.extend_from_slice(&(count as i32).to_le_bytes());
        for entry in self.entries.iter().take(MAX_BATCH) {
            out.extend_from_slice(&entry.x.to_le_bytes());
            out.extend_from_slice(&entry.y.to_le_bytes());
            out.extend_from_slice(&entry.life_steps.to_le_bytes());
        }
        // Unused slots are zero-filled
        out.resize(Self::SIZE, 0);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        expect_len(bytes, Self::SIZE)?;
        let count = read_i32(bytes, 0);
        if count < 0 || count as usize > MAX_BATCH {
            return Err(DecodeError::Count {
                count,
                capacity: MAX_BATCH,
            });
        }

        let entries = (0..count as usize)
            .map(|i| {
                let base = 4 + i * ENTRY_SIZE;
                BatchEntry {
                    x: read_f64(bytes, base),
                    y: read_f64(bytes, base + 8),
                    life_steps: read_i32(bytes, base + 16),
                }
            })
            .collect();

        Ok(Self { entries })
    }
}

macro_rules! batch_record {
    ($name:ident) => {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name(pub EntityBatch);

        impl WireRecord for $name {
            const NAME: &'static str = stringify!($name);
            const SIZE: usize = EntityBatch::SIZE;

            fn encode(&self) -> Vec<u8> {
                self.0.encode()
            }

            fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
                EntityBatch::decode(bytes).map($name)
            }
        }
    };
}

batch_record!(ObstacleBatch);
batch_record!(TargetBatch);
