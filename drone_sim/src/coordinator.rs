//! Coordinator actor: the blackboard that owns the world.
//!
//! One loop, one blocking point. Each iteration:
//!
//! ```text
//! wait (biased select) -> collect one more record from every other ready link
//!   -> apply events in order -> advance world once -> publish snapshot
//! ```
//!
//! Tie-break order is supervision, keys, drone state, obstacles, targets.
//! At most one force command leaves per iteration, which keeps the
//! coordinator/integrator link pair from filling up in both directions.

use crate::exit::ExitReason;
use crate::render::Renderer;
use drone_core::{
    DroneState, EntityKind, EntityLifecycle, FieldSources, ForceCommand, ForceField, KeyEvent,
    KeyOutcome, ObstacleBatch, SimParams, TargetBatch, WorldSnapshot, WorldState,
};
use drone_env::{Heartbeat, LinkError, LinkReceiver, LinkSender, Supervision, SupervisionRx};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

/// Which field sources fold into the outgoing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub wall_repulsion: bool,
    pub obstacle_repulsion: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            wall_repulsion: false,
            obstacle_repulsion: true,
        }
    }
}

impl CoordinatorConfig {
    fn sources(&self) -> FieldSources {
        FieldSources {
            walls: self.wall_repulsion,
            obstacles: self.obstacle_repulsion,
        }
    }
}

/// Every link the coordinator owns.
pub struct CoordinatorLinks {
    pub keys: LinkReceiver<KeyEvent>,
    pub states: LinkReceiver<DroneState>,
    pub obstacles: LinkReceiver<ObstacleBatch>,
    pub targets: LinkReceiver<TargetBatch>,
    pub commands: LinkSender<ForceCommand>,
}

impl CoordinatorLinks {
    fn malformed(&self) -> u64 {
        self.keys.malformed_count()
            + self.states.malformed_count()
            + self.obstacles.malformed_count()
            + self.targets.malformed_count()
    }

    fn close(&mut self) {
        self.keys.close();
        self.states.close();
        self.obstacles.close();
        self.targets.close();
    }
}

/// Final accounting returned when the loop ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorReport {
    pub reason: ExitReason,
    pub score: u32,
    pub targets_collected: u32,

    /// Iterations advanced
    pub ticks: u64,

    pub final_state: DroneState,

    /// Records discarded across all inbound links
    pub malformed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Supervision,
    Keys,
    States,
    Obstacles,
    Targets,
}

#[derive(Debug)]
enum Event {
    Supervision(Supervision),
    Key(KeyEvent),
    State(DroneState),
    Obstacles(ObstacleBatch),
    Targets(TargetBatch),
    Closed(&'static str),
}

fn to_event<T>(result: Result<T, LinkError>, wrap: fn(T) -> Event) -> Event {
    match result {
        Ok(record) => wrap(record),
        Err(e) => Event::Closed(e.link()),
    }
}

fn polled<T>(result: Result<Option<T>, LinkError>, wrap: fn(T) -> Event) -> Option<Event> {
    match result {
        Ok(Some(record)) => Some(wrap(record)),
        Ok(None) => None,
        Err(e) => Some(Event::Closed(e.link())),
    }
}

/// The blackboard actor.
pub struct Coordinator<R> {
    params: SimParams,
    config: CoordinatorConfig,
    field: ForceField,
    world: WorldState,
    lifecycle: EntityLifecycle,
    tick: u64,

    /// Last command actually written to the integrator
    last_sent: ForceCommand,

    /// A key asked for a send this iteration even if the force is unchanged
    force_send: bool,
    reset_pending: bool,

    links: CoordinatorLinks,
    renderer: R,
    heartbeat: Heartbeat,
    supervision: SupervisionRx,
}

impl<R: Renderer> Coordinator<R> {
    pub fn new(
        params: SimParams,
        config: CoordinatorConfig,
        links: CoordinatorLinks,
        renderer: R,
        heartbeat: Heartbeat,
        supervision: SupervisionRx,
    ) -> Self {
        Self {
            field: ForceField::new(&params),
            lifecycle: EntityLifecycle::new(params.world_half),
            world: WorldState::default(),
            tick: 0,
            last_sent: ForceCommand::default(),
            force_send: false,
            reset_pending: false,
            params,
            config,
            links,
            renderer,
            heartbeat,
            supervision,
        }
    }

    /// Runs until quit, shutdown, a closed inbound link or a failed send.
    ///
    /// Every inbound link is closed before returning and the command link
    /// is dropped with `self`, so peers observe end-of-stream.
    pub async fn run(mut self) -> CoordinatorReport {
        info!(
            wall_repulsion = self.config.wall_repulsion,
            obstacle_repulsion = self.config.obstacle_repulsion,
            "coordinator started"
        );

        let reason = match self.run_loop().await {
            Ok(reason) => reason,
            Err(e) => {
                warn!(error = %e, "coordinator stopping");
                ExitReason::from(e)
            }
        };

        self.links.close();
        let report = CoordinatorReport {
            reason,
            score: self.world.score,
            targets_collected: self.lifecycle.targets_collected(),
            ticks: self.tick,
            final_state: self.world.drone,
            malformed: self.links.malformed(),
        };
        info!(
            reason = %report.reason,
            score = report.score,
            ticks = report.ticks,
            "coordinator stopped"
        );
        report
    }

    async fn run_loop(&mut self) -> Result<ExitReason, LinkError> {
        // Start the integrator from a defined command
        self.links.commands.send(&self.last_sent).await?;

        loop {
            let (source, first) = self.wait().await;
            let mut events = vec![first];
            self.collect_ready(source, &mut events);

            for event in events {
                if let Some(reason) = self.handle(event) {
                    return Ok(reason);
                }
            }

            self.advance().await?;
            self.publish();
        }
    }

    /// Blocks until any inbound link or the supervision broadcast is ready.
    async fn wait(&mut self) -> (Source, Event) {
        let links = &mut self.links;
        tokio::select! {
            biased;
            msg = self.supervision.next() => (Source::Supervision, Event::Supervision(msg)),
            r = links.keys.recv() => (Source::Keys, to_event(r, Event::Key)),
            r = links.states.recv() => (Source::States, to_event(r, Event::State)),
            r = links.obstacles.recv() => (Source::Obstacles, to_event(r, Event::Obstacles)),
            r = links.targets.recv() => (Source::Targets, to_event(r, Event::Targets)),
        }
    }

    /// Takes at most one more record from every link other than the one
    /// that woke the loop.
    fn collect_ready(&mut self, woke: Source, events: &mut Vec<Event>) {
        if woke != Source::Supervision {
            if let Some(msg) = self.supervision.try_next() {
                events.push(Event::Supervision(msg));
            }
        }
        let links = &mut self.links;
        if woke != Source::Keys {
            events.extend(polled(links.keys.try_recv(), Event::Key));
        }
        if woke != Source::States {
            events.extend(polled(links.states.try_recv(), Event::State));
        }
        if woke != Source::Obstacles {
            events.extend(polled(links.obstacles.try_recv(), Event::Obstacles));
        }
        if woke != Source::Targets {
            events.extend(polled(links.targets.try_recv(), Event::Targets));
        }
    }

    /// Applies one event. Returns an exit reason when the loop must end.
    fn handle(&mut self, event: Event) -> Option<ExitReason> {
        match event {
            Event::Supervision(Supervision::Shutdown) => {
                info!("shutdown broadcast received");
                Some(ExitReason::Shutdown)
            }
            Event::Supervision(Supervision::Warn(peer)) => {
                warn!(peer = %peer, "watchdog warning");
                None
            }
            Event::Key(key) => self.handle_key(key.as_char()),
            Event::State(state) => {
                trace!(x = state.x, y = state.y, vx = state.vx, vy = state.vy, "drone state");
                self.world.drone = state;
                None
            }
            Event::Obstacles(batch) => {
                let n = self.lifecycle.apply_batch(EntityKind::Obstacle, &batch.0);
                info!(count = n, "obstacle batch received");
                None
            }
            Event::Targets(batch) => {
                let n = self.lifecycle.apply_batch(EntityKind::Target, &batch.0);
                info!(count = n, "target batch received");
                None
            }
            Event::Closed(link) => {
                info!(link, "end of stream");
                Some(ExitReason::PeerClosed(link))
            }
        }
    }

    fn handle_key(&mut self, key: char) -> Option<ExitReason> {
        match self.world.handle_key(key, self.params.force_step) {
            KeyOutcome::Quit => Some(ExitReason::Quit),
            KeyOutcome::Send(cmd) => {
                self.force_send = true;
                self.reset_pending |= cmd.reset;
                None
            }
            KeyOutcome::Ignored | KeyOutcome::Unchanged => None,
        }
    }

    /// Advances the world by one tick and sends the composed command if needed.
    async fn advance(&mut self) -> Result<(), LinkError> {
        self.tick += 1;

        let outcome = self.lifecycle.tick(self.world.drone.position(), self.tick);
        if outcome.expired_obstacles + outcome.expired_targets > 0 {
            debug!(
                obstacles = outcome.expired_obstacles,
                targets = outcome.expired_targets,
                tick = self.tick,
                "entities expired"
            );
        }
        if !outcome.hits.is_empty() {
            self.world.score = self.lifecycle.score();
            info!(
                slots = ?outcome.hits,
                score = self.world.score,
                tick = self.tick,
                "target hit"
            );
        }

        let command = self.compose();
        if self.force_send || command != self.last_sent {
            self.links.commands.send(&command).await?;
            self.last_sent = command;
        }
        self.force_send = false;
        self.reset_pending = false;

        self.heartbeat.beat();
        Ok(())
    }

    /// Key force plus field force. Paused worlds command nothing, and a
    /// reset carries no force at all; the field folds back in next tick.
    fn compose(&self) -> ForceCommand {
        if self.reset_pending {
            return ForceCommand::reset();
        }
        if self.world.paused {
            return ForceCommand::default();
        }
        let field = self.field.total(
            self.world.drone.position(),
            self.lifecycle.obstacles().as_slice(),
            self.config.sources(),
        );
        ForceCommand::new(self.world.force.fx + field.x, self.world.force.fy + field.y)
    }

    fn publish(&mut self) {
        let snapshot = WorldSnapshot::capture(&self.world, self.last_sent, &self.lifecycle, self.tick);
        self.renderer.render(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::WatchRenderer;
    use drone_core::wire::BatchEntry;
    use drone_core::EntityBatch;
    use drone_env::{heartbeat_channel, link, supervision_channel, PeerId};
    use tokio::sync::{broadcast, watch};

    struct Harness {
        keys: LinkSender<KeyEvent>,
        states: LinkSender<DroneState>,
        obstacles: LinkSender<ObstacleBatch>,
        targets: LinkSender<TargetBatch>,
        commands: LinkReceiver<ForceCommand>,
        supervision: broadcast::Sender<Supervision>,
        frames: watch::Receiver<WorldSnapshot>,
    }

    fn coordinator(config: CoordinatorConfig) -> (Coordinator<WatchRenderer>, Harness) {
        let (keys_tx, keys) = link("keys", 64);
        let (states_tx, states) = link("states", 64);
        let (obstacles_tx, obstacles) = link("obstacles", 64);
        let (targets_tx, targets) = link("targets", 64);
        let (commands, commands_rx) = link("commands", 64);
        let (hub, _beats) = heartbeat_channel(8);
        let supervision = supervision_channel();
        let (renderer, frames) = WatchRenderer::new();

        let coordinator = Coordinator::new(
            SimParams::default(),
            config,
            CoordinatorLinks {
                keys,
                states,
                obstacles,
                targets,
                commands,
            },
            renderer,
            hub.register(PeerId::Coordinator),
            SupervisionRx::new(&supervision),
        );
        let harness = Harness {
            keys: keys_tx,
            states: states_tx,
            obstacles: obstacles_tx,
            targets: targets_tx,
            commands: commands_rx,
            supervision,
            frames,
        };
        (coordinator, harness)
    }

    fn no_field() -> CoordinatorConfig {
        CoordinatorConfig {
            wall_repulsion: false,
            obstacle_repulsion: false,
        }
    }

    #[tokio::test]
    async fn test_key_eof_ends_loop_and_closes_commands() {
        let (coord, mut h) = coordinator(no_field());
        let task = tokio::spawn(coord.run());

        h.keys.send(&KeyEvent::new(b'f')).await.unwrap();
        drop(h.keys);

        let report = task.await.unwrap();
        assert_eq!(report.reason, ExitReason::PeerClosed("keys"));
        assert!(!report.reason.is_failure());

        // Initial zero command, then the thrust
        assert_eq!(h.commands.recv().await.unwrap(), ForceCommand::default());
        assert_eq!(h.commands.recv().await.unwrap(), ForceCommand::new(1.0, 0.0));
        assert!(h.commands.recv().await.unwrap_err().is_closed());
        assert!(h.states.is_closed());
    }

    #[tokio::test]
    async fn test_quit_key_stops_with_quit() {
        let (coord, h) = coordinator(no_field());
        h.keys.send(&KeyEvent::new(b'q')).await.unwrap();
        let report = coord.run().await;
        assert_eq!(report.reason, ExitReason::Quit);
        assert_eq!(report.ticks, 0);
    }

    #[tokio::test]
    async fn test_shutdown_broadcast_stops_loop() {
        let (coord, h) = coordinator(no_field());
        let task = tokio::spawn(coord.run());
        h.supervision.send(Supervision::Shutdown).unwrap();
        let report = task.await.unwrap();
        assert_eq!(report.reason, ExitReason::Shutdown);
    }

    #[tokio::test]
    async fn test_reset_sent_once() {
        let (coord, mut h) = coordinator(no_field());
        h.states.send(&DroneState::new(5.0, 5.0, 3.0, 3.0)).await.unwrap();
        h.keys.send(&KeyEvent::new(b'R')).await.unwrap();
        h.states.send(&DroneState::default()).await.unwrap();
        h.keys.send(&KeyEvent::new(b'q')).await.unwrap();

        let report = coord.run().await;
        assert_eq!(report.reason, ExitReason::Quit);

        let mut sent = Vec::new();
        while let Ok(Some(cmd)) = h.commands.try_recv() {
            sent.push(cmd);
        }
        assert_eq!(sent.iter().filter(|c| c.reset).count(), 1);
        assert!(sent.contains(&ForceCommand::reset()));
    }

    #[tokio::test]
    async fn test_reset_carries_no_field_force() {
        let (coord, mut h) = coordinator(CoordinatorConfig::default());
        let task = tokio::spawn(coord.run());

        let batch = EntityBatch::new(vec![BatchEntry {
            x: -5.0,
            y: 0.0,
            life_steps: 1000,
        }]);
        h.obstacles.send(&ObstacleBatch(batch)).await.unwrap();
        assert_eq!(h.commands.recv().await.unwrap(), ForceCommand::default());
        let pushed = h.commands.recv().await.unwrap();
        assert!(pushed.fx > 0.0 && !pushed.reset, "{pushed:?}");

        h.states.send(&DroneState::new(5.0, 5.0, 3.0, 3.0)).await.unwrap();
        h.keys.send(&KeyEvent::new(b'R')).await.unwrap();
        let reset = loop {
            let cmd = h.commands.recv().await.unwrap();
            if cmd.reset {
                break cmd;
            }
        };
        assert_eq!(reset, ForceCommand::reset());

        h.keys.send(&KeyEvent::new(b'q')).await.unwrap();
        assert_eq!(task.await.unwrap().reason, ExitReason::Quit);

        // The field comes back without the reset flag
        while let Ok(Some(cmd)) = h.commands.try_recv() {
            assert!(!cmd.reset, "{cmd:?}");
        }
    }

    #[tokio::test]
    async fn test_pause_sends_single_zero_command() {
        let (coord, mut h) = coordinator(CoordinatorConfig::default());
        let task = tokio::spawn(coord.run());

        let batch = EntityBatch::new(vec![BatchEntry {
            x: -5.0,
            y: 0.0,
            life_steps: 1000,
        }]);
        h.obstacles.send(&ObstacleBatch(batch)).await.unwrap();
        h.keys.send(&KeyEvent::new(b'f')).await.unwrap();
        loop {
            let frame = h.frames.borrow_and_update().clone();
            if frame.world.force.fx == 1.0 && frame.obstacles.len() == 1 {
                // Key thrust plus the obstacle push
                assert!(frame.command.fx > 1.0 && !frame.command.reset);
                break;
            }
            h.frames.changed().await.unwrap();
        }
        // Commands go out before the frame that reflects them
        while let Ok(Some(_)) = h.commands.try_recv() {}

        h.keys.send(&KeyEvent::new(b'p')).await.unwrap();
        // Further traffic while paused must not produce more commands
        for _ in 0..3 {
            h.states.send(&DroneState::new(1.0, 0.0, 0.5, 0.0)).await.unwrap();
        }
        h.keys.send(&KeyEvent::new(b'e')).await.unwrap();
        loop {
            h.frames.changed().await.unwrap();
            let frame = h.frames.borrow();
            if frame.world.paused && frame.world.last_key == 'e' {
                break;
            }
        }
        h.keys.send(&KeyEvent::new(b'q')).await.unwrap();
        assert_eq!(task.await.unwrap().reason, ExitReason::Quit);

        let mut sent = Vec::new();
        while let Ok(Some(cmd)) = h.commands.try_recv() {
            sent.push(cmd);
        }
        assert_eq!(sent, vec![ForceCommand::default()]);
    }

    #[tokio::test]
    async fn test_target_hit_scores_once() {
        let (coord, mut h) = coordinator(no_field());
        let task = tokio::spawn(coord.run());

        let batch = EntityBatch::new(vec![BatchEntry {
            x: 0.5,
            y: 0.0,
            life_steps: 1000,
        }]);
        h.targets.send(&TargetBatch(batch)).await.unwrap();
        // Drone parked on the target for a few more iterations
        for _ in 0..3 {
            h.states.send(&DroneState::default()).await.unwrap();
        }
        loop {
            h.frames.changed().await.unwrap();
            if h.frames.borrow().world.score > 0 {
                break;
            }
        }
        h.keys.send(&KeyEvent::new(b'q')).await.unwrap();

        let report = task.await.unwrap();
        assert_eq!(report.score, 1);
        assert_eq!(report.targets_collected, 1);
        let frame = h.frames.borrow();
        assert_eq!(frame.world.score, 1);
        assert_eq!(frame.targets_collected, 1);
        assert!(frame.targets.is_empty());
        assert!(frame.last_hit_tick.is_some());
    }

    #[tokio::test]
    async fn test_obstacle_repulsion_folds_into_command() {
        let (coord, mut h) = coordinator(CoordinatorConfig::default());
        let task = tokio::spawn(coord.run());

        let batch = EntityBatch::new(vec![BatchEntry {
            x: -10.0,
            y: 0.0,
            life_steps: 1000,
        }]);
        h.obstacles.send(&ObstacleBatch(batch)).await.unwrap();

        assert_eq!(h.commands.recv().await.unwrap(), ForceCommand::default());
        let pushed = h.commands.recv().await.unwrap();
        assert!(pushed.fx > 0.0, "obstacle on the left pushes right: {pushed:?}");
        assert_eq!(pushed.fy, 0.0);

        h.keys.send(&KeyEvent::new(b'q')).await.unwrap();
        assert_eq!(task.await.unwrap().reason, ExitReason::Quit);
    }

    #[tokio::test]
    async fn test_malformed_state_is_counted_not_fatal() {
        let (coord, h) = coordinator(no_field());
        h.states.send_raw(vec![0u8; 7]).await.unwrap();
        h.states.send(&DroneState::new(1.0, 2.0, 0.0, 0.0)).await.unwrap();
        h.keys.send(&KeyEvent::new(b'q')).await.unwrap();

        let report = coord.run().await;
        assert_eq!(report.malformed, 1);
        assert_eq!(report.reason, ExitReason::Quit);
        drop(h);
    }
}
