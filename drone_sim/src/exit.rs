//! Why an actor stopped.

use drone_env::LinkError;
use serde::Serialize;

/// Exit reason shared by every actor.
///
/// Only `SendFailed` and a watchdog kill count as failures; everything else
/// is part of the cooperative shutdown cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    /// Explicit quit command
    Quit,

    /// An input link reached end-of-stream
    PeerClosed(&'static str),

    /// A consumer disappeared while this actor still had data
    SendFailed(&'static str),

    /// Supervision broadcast asked everyone to stop
    Shutdown,
}

impl ExitReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitReason::SendFailed(_))
    }
}

impl From<LinkError> for ExitReason {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::Closed { link } => ExitReason::PeerClosed(link),
            LinkError::SendFailed { link } => ExitReason::SendFailed(link),
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Quit => write!(f, "quit"),
            ExitReason::PeerClosed(link) => write!(f, "peer closed '{link}'"),
            ExitReason::SendFailed(link) => write!(f, "send failed on '{link}'"),
            ExitReason::Shutdown => write!(f, "shutdown"),
        }
    }
}
