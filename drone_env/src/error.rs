//! Error types for the arena environment layer.

use thiserror::Error;

/// Errors that can occur on a record link.
///
/// Malformed records never surface here: receivers count and skip them, so
/// receiving only fails at end-of-stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The peer closed its end of the link.
    ///
    /// This is the normal end-of-life signal and triggers a cooperative
    /// shutdown of the reading actor.
    #[error("link '{link}' closed by peer")]
    Closed { link: &'static str },

    /// The consumer is gone while the producer still has data.
    #[error("send on '{link}' failed: receiver dropped")]
    SendFailed { link: &'static str },
}

impl LinkError {
    /// Returns the name of the link the error occurred on.
    pub fn link(&self) -> &'static str {
        match self {
            Self::Closed { link } | Self::SendFailed { link } => link,
        }
    }

    /// Returns true for the cooperative end-of-stream case.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}

/// Errors produced while decoding a fixed-size wire record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The byte slice does not match the record size.
    #[error("expected {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },

    /// A batch header declares more entries than the batch can hold.
    #[error("batch count {count} outside 0..={capacity}")]
    Count { count: i32, capacity: usize },
}
