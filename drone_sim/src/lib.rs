//! Drone Arena actor runtime
//!
//! Runs the arena as a group of message-passing actors. No memory is shared
//! between them: every transfer is a fixed-size record copied through a
//! bounded link, and a closed link is the end-of-life signal.
//!
//! # Architecture
//!
//! ```text
//!   ┌───────┐  KeyEvent   ┌─────────────┐  ForceCommand  ┌────────────┐
//!   │ Input │────────────►│             │───────────────►│            │
//!   └───────┘             │ Coordinator │                │ Integrator │
//!   ┌─────────────┐       │ (blackboard)│◄───────────────│            │
//!   │ ObstacleGen │──────►│             │   DroneState   └────────────┘
//!   └─────────────┘       │             │
//!   ┌─────────────┐       │             │──► Renderer (WorldSnapshot)
//!   │  TargetGen  │──────►│             │
//!   └─────────────┘       └─────────────┘
//!
//!   every actor ──heartbeat──► Watchdog ──Warn / Shutdown──► every actor
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use drone_sim::{ArenaSystem, InputSource, LogRenderer, SystemConfig};
//! use drone_env::TokioContext;
//!
//! let ctx = TokioContext::shared(42);
//! let handle = ArenaSystem::launch(ctx, SystemConfig::default(), InputSource::Stdin, LogRenderer::new(20));
//! let summary = handle.join().await?;
//! std::process::exit(summary.exit_code());
//! ```

mod context;
mod coordinator;
mod dynamics;
mod exit;
mod generators;
mod input;
mod render;
mod system;
mod watchdog;

pub use context::SimContext;
pub use coordinator::{Coordinator, CoordinatorConfig, CoordinatorLinks, CoordinatorReport};
pub use dynamics::{run_integrator, IntegratorReport};
pub use exit::ExitReason;
pub use generators::{
    run_obstacle_generator, run_target_generator, GeneratorConfig, GeneratorReport,
    OBSTACLE_STREAM, TARGET_STREAM,
};
pub use input::{ScriptedInput, StdinInput};
pub use render::{LogRenderer, Renderer, WatchRenderer};
pub use system::{ArenaHandle, ArenaSystem, InputSource, RunSummary, SystemConfig, SystemError};
pub use watchdog::{run_watchdog, WatchdogReport};
