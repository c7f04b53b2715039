//! Integrator actor: fixed-tick physics driven by the coordinator's commands.

use crate::exit::ExitReason;
use drone_core::{DroneState, ForceCommand, Integrator, SimParams};
use drone_env::{ArenaContext, Heartbeat, LinkReceiver, LinkSender, Supervision, SupervisionRx};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegratorReport {
    pub reason: ExitReason,
    pub steps: u64,
    pub final_state: DroneState,
}

/// Runs the integrator until its command link closes or shutdown arrives.
///
/// Per tick: take at most one pending command (keeping the last one
/// otherwise), step, publish the state, beat, sleep `dt`.
pub async fn run_integrator<C: ArenaContext>(
    ctx: Arc<C>,
    params: SimParams,
    mut commands: LinkReceiver<ForceCommand>,
    states: LinkSender<DroneState>,
    heartbeat: Heartbeat,
    mut supervision: SupervisionRx,
) -> IntegratorReport {
    let mut integrator = Integrator::new(&params);
    let period = params.tick_period();
    info!(
        mass = params.mass,
        visc = params.visc,
        dt = params.dt,
        "integrator started"
    );

    let reason = loop {
        if supervision.shutdown_requested() {
            break ExitReason::Shutdown;
        }

        match commands.try_recv() {
            Ok(Some(cmd)) => {
                debug!(fx = cmd.fx, fy = cmd.fy, reset = cmd.reset, "command applied");
                integrator.apply(cmd);
            }
            Ok(None) => {}
            Err(e) => {
                info!(link = e.link(), "end of stream");
                break ExitReason::from(e);
            }
        }

        let state = integrator.step();
        if let Some(reason) = publish(&states, &state, &mut supervision).await {
            break reason;
        }

        heartbeat.beat();
        ctx.sleep(period).await;
    };

    // Stop accepting commands before the state link drops with us
    commands.close();
    info!(reason = %reason, steps = integrator.steps(), "integrator stopped");
    IntegratorReport {
        reason,
        steps: integrator.steps(),
        final_state: integrator.state(),
    }
}

/// Sends one state, giving up early if shutdown is broadcast while the
/// link is full.
async fn publish(
    states: &LinkSender<DroneState>,
    state: &DroneState,
    supervision: &mut SupervisionRx,
) -> Option<ExitReason> {
    let send = states.send(state);
    tokio::pin!(send);
    loop {
        tokio::select! {
            biased;
            result = &mut send => {
                return result.err().map(|e| {
                    warn!(error = %e, "coordinator gone");
                    ExitReason::from(e)
                });
            }
            msg = supervision.next() => {
                if msg == Supervision::Shutdown {
                    return Some(ExitReason::Shutdown);
                }
            }
        }
    }
}
