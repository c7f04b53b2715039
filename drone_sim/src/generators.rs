//! Obstacle and target generator actors.
//!
//! Each emits a full batch immediately, then one per interval, beating
//! while it waits. Randomness comes from the context's seeded streams, so a
//! fixed seed reproduces the exact batch sequence.

use crate::exit::ExitReason;
use drone_core::{
    spawn_obstacles, spawn_targets, ObstacleBatch, ObstacleSpawnConfig, SimParams, TargetBatch,
    TargetSpawnConfig,
};
use drone_env::{ArenaContext, Heartbeat, LinkSender, Supervision, SupervisionRx, WireRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// RNG stream for obstacle batches.
pub const OBSTACLE_STREAM: u64 = 1;
/// RNG stream for target batches.
pub const TARGET_STREAM: u64 = 2;

/// Generator cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub obstacle_interval: Duration,
    pub target_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            obstacle_interval: Duration::from_secs(40),
            target_interval: Duration::from_secs(50),
            heartbeat_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeneratorReport {
    pub batches: u64,
    pub reason: ExitReason,
}

/// Emits obstacle batches uniformly over the arena.
pub async fn run_obstacle_generator<C: ArenaContext>(
    ctx: Arc<C>,
    params: SimParams,
    config: GeneratorConfig,
    out: LinkSender<ObstacleBatch>,
    heartbeat: Heartbeat,
    supervision: SupervisionRx,
) -> GeneratorReport {
    let mut rng = ctx.rng(OBSTACLE_STREAM);
    let spawn = ObstacleSpawnConfig::from_params(&params);
    let make = move || ObstacleBatch(spawn_obstacles(&mut rng, &spawn));
    let cadence = Cadence {
        every: config.obstacle_interval,
        beat_every: config.heartbeat_interval,
    };
    run_generator(ctx, cadence, out, heartbeat, supervision, make).await
}

/// Emits spaced target batches inside the central disk.
pub async fn run_target_generator<C: ArenaContext>(
    ctx: Arc<C>,
    params: SimParams,
    config: GeneratorConfig,
    out: LinkSender<TargetBatch>,
    heartbeat: Heartbeat,
    supervision: SupervisionRx,
) -> GeneratorReport {
    let mut rng = ctx.rng(TARGET_STREAM);
    let spawn = TargetSpawnConfig::from_params(&params);
    let make = move || {
        let placed = spawn_targets(&mut rng, &spawn);
        if !placed.fallback.is_empty() {
            debug!(slots = ?placed.fallback, "targets placed without spacing check");
        }
        TargetBatch(placed.batch)
    };
    let cadence = Cadence {
        every: config.target_interval,
        beat_every: config.heartbeat_interval,
    };
    run_generator(ctx, cadence, out, heartbeat, supervision, make).await
}

struct Cadence {
    every: Duration,
    beat_every: Duration,
}

async fn run_generator<C, T, F>(
    ctx: Arc<C>,
    cadence: Cadence,
    out: LinkSender<T>,
    heartbeat: Heartbeat,
    mut supervision: SupervisionRx,
    mut make: F,
) -> GeneratorReport
where
    C: ArenaContext,
    T: WireRecord,
    F: FnMut() -> T,
{
    let peer = heartbeat.peer();
    let beat_every = cadence.beat_every.max(Duration::from_millis(1));
    let mut batches = 0u64;
    info!(peer = %peer, every = ?cadence.every, "generator started");

    let reason = 'run: loop {
        if supervision.shutdown_requested() {
            break ExitReason::Shutdown;
        }

        let batch = make();
        if let Err(e) = out.send(&batch).await {
            warn!(peer = %peer, error = %e, "coordinator gone");
            break ExitReason::from(e);
        }
        batches += 1;
        info!(peer = %peer, batches, "batch sent");
        heartbeat.beat();

        let due = ctx.now() + cadence.every;
        loop {
            let now = ctx.now();
            if now >= due {
                break;
            }
            let nap = beat_every.min(due - now);
            tokio::select! {
                biased;
                msg = supervision.next() => {
                    if msg == Supervision::Shutdown {
                        break 'run ExitReason::Shutdown;
                    }
                }
                _ = ctx.sleep(nap) => heartbeat.beat(),
            }
        }
    };

    info!(peer = %peer, batches, reason = %reason, "generator stopped");
    GeneratorReport { batches, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use drone_core::wire::MAX_BATCH;
    use drone_env::{heartbeat_channel, link, supervision_channel, PeerId};

    fn fast() -> GeneratorConfig {
        GeneratorConfig {
            obstacle_interval: Duration::from_secs(4),
            target_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_obstacle_batches_cover_arena() {
        let ctx = SimContext::shared(11);
        let (tx, mut rx) = link::<ObstacleBatch>("obstacles", 4);
        let (hub, _beats) = heartbeat_channel(64);
        let sup = supervision_channel();
        let params = SimParams::default();

        let task = tokio::spawn(run_obstacle_generator(
            ctx.clone(),
            params,
            fast(),
            tx,
            hub.register(PeerId::ObstacleGen),
            SupervisionRx::new(&sup),
        ));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.0.len(), MAX_BATCH);
        assert_ne!(first, second);
        for e in first.0.entries.iter().chain(&second.0.entries) {
            assert!(e.x.abs() <= params.world_half && e.y.abs() <= params.world_half);
            assert_eq!(e.life_steps, 1000);
        }
        // The second batch waited out a full interval
        assert!(ctx.now() >= Duration::from_secs(4));

        drop(rx);
        let report = task.await.unwrap();
        assert_eq!(report.reason, ExitReason::SendFailed("obstacles"));
        assert!(report.batches >= 2);
    }

    #[tokio::test]
    async fn test_target_batches_reproducible_per_seed() {
        async fn first_batch(seed: u64) -> TargetBatch {
            let ctx = SimContext::shared(seed);
            let (tx, mut rx) = link::<TargetBatch>("targets", 4);
            let (hub, _beats) = heartbeat_channel(64);
            let sup = supervision_channel();
            let task = tokio::spawn(run_target_generator(
                ctx,
                SimParams::default(),
                fast(),
                tx,
                hub.register(PeerId::TargetGen),
                SupervisionRx::new(&sup),
            ));
            let batch = rx.recv().await.unwrap();
            sup.send(Supervision::Shutdown).unwrap();
            assert_eq!(task.await.unwrap().reason, ExitReason::Shutdown);
            batch
        }

        let a = first_batch(3).await;
        let b = first_batch(3).await;
        let c = first_batch(4).await;
        assert_eq!(a, b);
        assert_ne!(a, c);
        for e in &a.0.entries {
            assert!(e.x.hypot(e.y) <= 50.0 + 1e-9);
        }
    }

    #[tokio::test]
    async fn test_generator_beats_while_waiting() {
        let ctx = SimContext::shared(5);
        let (tx, mut rx) = link::<TargetBatch>("targets", 4);
        let (hub, mut beats) = heartbeat_channel(64);
        let sup = supervision_channel();

        let task = tokio::spawn(run_target_generator(
            ctx,
            SimParams::default(),
            fast(),
            tx,
            hub.register(PeerId::TargetGen),
            SupervisionRx::new(&sup),
        ));
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        sup.send(Supervision::Shutdown).unwrap();
        task.await.unwrap();

        let mut count = 0;
        while let Ok(peer) = beats.try_recv() {
            assert_eq!(peer, PeerId::TargetGen);
            count += 1;
        }
        // One per batch plus one per second of waiting
        assert!(count >= 6, "only {count} beats");
    }
}
