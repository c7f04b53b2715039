//! Wires every actor together and runs the group to completion.

use crate::coordinator::{Coordinator, CoordinatorConfig, CoordinatorLinks, CoordinatorReport};
use crate::dynamics::{run_integrator, IntegratorReport};
use crate::exit::ExitReason;
use crate::generators::{run_obstacle_generator, run_target_generator, GeneratorConfig, GeneratorReport};
use crate::input::{ScriptedInput, StdinInput};
use crate::render::Renderer;
use crate::watchdog::{run_watchdog, WatchdogReport};
use drone_core::{KeyEvent, SimParams, WatchdogConfig};
use drone_env::{
    heartbeat_channel, link, supervision_channel, ArenaContext, LinkSender, PeerId, Supervision,
    SupervisionRx, DEFAULT_LINK_CAPACITY,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tracing::info;

/// Everything needed to start a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemConfig {
    pub params: SimParams,
    pub coordinator: CoordinatorConfig,
    pub watchdog: WatchdogConfig,
    pub generators: GeneratorConfig,

    /// Records each link buffers; 0 means the default
    pub link_capacity: usize,
}

impl SystemConfig {
    fn capacity(&self) -> usize {
        if self.link_capacity == 0 {
            DEFAULT_LINK_CAPACITY
        } else {
            self.link_capacity
        }
    }
}

/// Where key events come from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Stdin,
    Scripted { keys: String, interval: Duration },

    /// The caller drives the key link through [`ArenaHandle::keys`]. The
    /// input peer is not supervised in this mode.
    External,
}

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("task '{task}' did not complete: {source}")]
    Join {
        task: &'static str,
        #[source]
        source: JoinError,
    },
}

fn joined<T>(task: &'static str, result: Result<T, JoinError>) -> Result<T, SystemError> {
    result.map_err(|source| SystemError::Join { task, source })
}

/// How the run ended, actor by actor.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub coordinator: CoordinatorReport,
    pub integrator: IntegratorReport,
    pub obstacles: GeneratorReport,
    pub targets: GeneratorReport,
    pub input: Option<ExitReason>,
    pub watchdog: WatchdogReport,
}

impl RunSummary {
    /// True when the watchdog ended the group.
    pub fn killed(&self) -> bool {
        self.watchdog.killed()
    }

    /// Process exit status: 1 after a watchdog kill, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.killed() {
            1
        } else {
            0
        }
    }
}

/// A running arena.
pub struct ArenaHandle {
    /// Key link sender when launched with [`InputSource::External`]. Drop
    /// it to deliver end-of-stream to the coordinator.
    pub keys: Option<LinkSender<KeyEvent>>,

    supervision: broadcast::Sender<Supervision>,
    coordinator: JoinHandle<CoordinatorReport>,
    integrator: JoinHandle<IntegratorReport>,
    obstacles: JoinHandle<GeneratorReport>,
    targets: JoinHandle<GeneratorReport>,
    input: Option<JoinHandle<ExitReason>>,
    watchdog: JoinHandle<WatchdogReport>,
}

impl ArenaHandle {
    /// Broadcasts a cooperative shutdown to every actor. The coordinator
    /// reports [`ExitReason::Shutdown`]; collect the reports with
    /// [`join`](Self::join).
    pub fn shutdown(&self) {
        let _ = self.supervision.send(Supervision::Shutdown);
    }

    /// Waits for the coordinator, then stops the remaining actors and
    /// collects every report.
    pub async fn join(mut self) -> Result<RunSummary, SystemError> {
        let coordinator = joined("coordinator", (&mut self.coordinator).await)?;

        // Generators and input may be parked in long sleeps
        self.keys.take();
        self.shutdown();

        let integrator = joined("integrator", self.integrator.await)?;
        let obstacles = joined("obstacle generator", self.obstacles.await)?;
        let targets = joined("target generator", self.targets.await)?;
        let input = match self.input {
            Some(handle) => Some(joined("input", handle.await)?),
            None => None,
        };
        let watchdog = joined("watchdog", self.watchdog.await)?;

        info!(
            reason = %coordinator.reason,
            score = coordinator.score,
            killed = watchdog.killed(),
            "arena stopped"
        );
        Ok(RunSummary {
            coordinator,
            integrator,
            obstacles,
            targets,
            input,
            watchdog,
        })
    }
}

/// Entry point for starting the whole actor group.
pub struct ArenaSystem;

impl ArenaSystem {
    /// Creates every link and spawns every actor on `ctx`.
    pub fn launch<C, R>(ctx: Arc<C>, config: SystemConfig, input: InputSource, renderer: R) -> ArenaHandle
    where
        C: ArenaContext,
        R: Renderer,
    {
        let capacity = config.capacity();
        let (keys_tx, keys_rx) = link::<KeyEvent>("keys", capacity);
        let (commands_tx, commands_rx) = link("commands", capacity);
        let (states_tx, states_rx) = link("states", capacity);
        let (obstacles_tx, obstacles_rx) = link("obstacles", capacity);
        let (targets_tx, targets_rx) = link("targets", capacity);

        let (hub, heartbeats) = heartbeat_channel(capacity * PeerId::ROSTER.len());
        let supervision = supervision_channel();

        let roster: Vec<PeerId> = PeerId::ROSTER
            .iter()
            .copied()
            .filter(|&p| !(p == PeerId::Input && matches!(input, InputSource::External)))
            .collect();
        info!(peers = ?roster, seed = ctx.seed(), "launching arena");

        // Subscribe everyone before anything can broadcast
        let coordinator = Coordinator::new(
            config.params,
            config.coordinator,
            CoordinatorLinks {
                keys: keys_rx,
                states: states_rx,
                obstacles: obstacles_rx,
                targets: targets_rx,
                commands: commands_tx,
            },
            renderer,
            hub.register(PeerId::Coordinator),
            SupervisionRx::new(&supervision),
        );
        let integrator = run_integrator(
            ctx.clone(),
            config.params,
            commands_rx,
            states_tx,
            hub.register(PeerId::Integrator),
            SupervisionRx::new(&supervision),
        );
        let obstacles = run_obstacle_generator(
            ctx.clone(),
            config.params,
            config.generators,
            obstacles_tx,
            hub.register(PeerId::ObstacleGen),
            SupervisionRx::new(&supervision),
        );
        let targets = run_target_generator(
            ctx.clone(),
            config.params,
            config.generators,
            targets_tx,
            hub.register(PeerId::TargetGen),
            SupervisionRx::new(&supervision),
        );

        let watchdog = ctx.spawn(
            "watchdog",
            run_watchdog(ctx.clone(), roster, config.watchdog, heartbeats, supervision.clone()),
        );

        let (keys, input) = match input {
            InputSource::External => (Some(keys_tx), None),
            InputSource::Stdin => {
                let task = StdinInput {
                    heartbeat_interval: config.generators.heartbeat_interval,
                }
                .run(
                    ctx.clone(),
                    keys_tx,
                    hub.register(PeerId::Input),
                    SupervisionRx::new(&supervision),
                );
                (None, Some(ctx.spawn("input", task)))
            }
            InputSource::Scripted { keys, interval } => {
                let task = ScriptedInput::new(keys, interval).run(
                    ctx.clone(),
                    keys_tx,
                    hub.register(PeerId::Input),
                    SupervisionRx::new(&supervision),
                );
                (None, Some(ctx.spawn("input", task)))
            }
        };

        // Only the actors' handles keep the heartbeat queue open now
        drop(hub);

        ArenaHandle {
            keys,
            coordinator: ctx.spawn("coordinator", coordinator.run()),
            integrator: ctx.spawn("integrator", integrator),
            obstacles: ctx.spawn("obstacle generator", obstacles),
            targets: ctx.spawn("target generator", targets),
            input,
            watchdog,
            supervision,
        }
    }
}
