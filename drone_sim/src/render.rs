//! Renderer seam: the coordinator publishes one snapshot per iteration.
//!
//! Drawing itself lives outside this crate. Two sinks ship here: a
//! `watch` channel for external frontends and tests, and a periodic log
//! line.

use drone_core::WorldSnapshot;
use tokio::sync::watch;
use tracing::info;

/// Consumer of world snapshots.
pub trait Renderer: Send + 'static {
    /// Called once per coordinator iteration. Must not block.
    fn render(&mut self, snapshot: &WorldSnapshot);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, snapshot: &WorldSnapshot) {
        (**self).render(snapshot)
    }
}

/// Publishes the latest snapshot into a `watch` channel.
pub struct WatchRenderer {
    tx: watch::Sender<WorldSnapshot>,
}

impl WatchRenderer {
    /// Creates the renderer and a receiver that always sees the latest frame.
    pub fn new() -> (Self, watch::Receiver<WorldSnapshot>) {
        let (tx, rx) = watch::channel(WorldSnapshot::default());
        (Self { tx }, rx)
    }
}

impl Renderer for WatchRenderer {
    fn render(&mut self, snapshot: &WorldSnapshot) {
        // send_replace keeps publishing even with no receiver left
        self.tx.send_replace(snapshot.clone());
    }
}

/// Logs a one-line summary every `every` frames.
pub struct LogRenderer {
    every: u64,
    frames: u64,
}

impl LogRenderer {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
        }
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, snapshot: &WorldSnapshot) {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return;
        }
        let w = &snapshot.world;
        info!(
            tick = snapshot.tick,
            x = format_args!("{:.2}", w.drone.x),
            y = format_args!("{:.2}", w.drone.y),
            vx = format_args!("{:.2}", w.drone.vx),
            vy = format_args!("{:.2}", w.drone.vy),
            fx = format_args!("{:.2}", snapshot.command.fx),
            fy = format_args!("{:.2}", snapshot.command.fy),
            paused = w.paused,
            score = w.score,
            collected = snapshot.targets_collected,
            obstacles = snapshot.obstacles.len(),
            targets = snapshot.targets.len(),
            last_key = %w.last_key,
            "world"
        );
    }
}
