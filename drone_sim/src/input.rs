//! Key sources feeding the coordinator's key link.

use crate::exit::ExitReason;
use drone_core::KeyEvent;
use drone_env::{ArenaContext, Heartbeat, LinkSender, Supervision, SupervisionRx};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Forwards a key, reporting whether input should stop afterwards.
async fn forward(keys: &LinkSender<KeyEvent>, byte: u8) -> Result<bool, ExitReason> {
    if byte == b'\n' || byte == b'\r' {
        return Ok(false);
    }
    let event = KeyEvent::new(byte);
    debug!(key = %event.as_char(), "key");
    keys.send(&event).await.map_err(ExitReason::from)?;
    Ok(byte == b'q')
}

/// Reads raw bytes from standard input, one key per byte.
///
/// In a cooked terminal keys arrive a line at a time; line breaks are
/// skipped.
pub struct StdinInput {
    pub heartbeat_interval: Duration,
}

impl Default for StdinInput {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(1),
        }
    }
}

impl StdinInput {
    pub async fn run<C: ArenaContext>(
        self,
        ctx: Arc<C>,
        keys: LinkSender<KeyEvent>,
        heartbeat: Heartbeat,
        mut supervision: SupervisionRx,
    ) -> ExitReason {
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 64];
        info!("reading keys from stdin");

        let reason = loop {
            tokio::select! {
                biased;
                msg = supervision.next() => {
                    if msg == Supervision::Shutdown {
                        break ExitReason::Shutdown;
                    }
                }
                read = stdin.read(&mut buf) => match read {
                    Ok(0) => {
                        info!("stdin closed");
                        break ExitReason::PeerClosed("stdin");
                    }
                    Ok(n) => {
                        if let Some(reason) = self.forward_all(&keys, &buf[..n]).await {
                            break reason;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break ExitReason::PeerClosed("stdin");
                    }
                },
                _ = ctx.sleep(self.heartbeat_interval) => {}
            }
            heartbeat.beat();
        };

        info!(reason = %reason, "input stopped");
        reason
    }

    async fn forward_all(&self, keys: &LinkSender<KeyEvent>, bytes: &[u8]) -> Option<ExitReason> {
        for &byte in bytes {
            match forward(keys, byte).await {
                Ok(true) => return Some(ExitReason::Quit),
                Ok(false) => {}
                Err(reason) => return Some(reason),
            }
        }
        None
    }
}

/// Plays a fixed key sequence, one key per `interval`, then closes the link.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    pub keys: String,
    pub interval: Duration,
}

impl ScriptedInput {
    pub fn new(keys: impl Into<String>, interval: Duration) -> Self {
        Self {
            keys: keys.into(),
            interval,
        }
    }

    pub async fn run<C: ArenaContext>(
        self,
        ctx: Arc<C>,
        keys: LinkSender<KeyEvent>,
        heartbeat: Heartbeat,
        mut supervision: SupervisionRx,
    ) -> ExitReason {
        info!(keys = self.keys.len(), interval = ?self.interval, "playing scripted keys");

        let reason = 'script: {
            for byte in self.keys.bytes() {
                tokio::select! {
                    biased;
                    msg = supervision.next() => {
                        if msg == Supervision::Shutdown {
                            break 'script ExitReason::Shutdown;
                        }
                    }
                    _ = ctx.sleep(self.interval) => {}
                }
                heartbeat.beat();

                match forward(&keys, byte).await {
                    Ok(true) => break 'script ExitReason::Quit,
                    Ok(false) => {}
                    Err(reason) => break 'script reason,
                }
            }
            ExitReason::PeerClosed("script")
        };

        // Dropping the sender here is the end-of-stream the coordinator sees
        info!(reason = %reason, "input stopped");
        reason
    }
}
