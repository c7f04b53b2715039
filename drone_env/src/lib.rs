//! Drone Arena Environment Abstraction Layer
//!
//! This crate provides the plumbing every arena actor runs on:
//! - Time and randomness (`ArenaContext`)
//! - Typed, bounded record links (`link()`)
//! - Heartbeats and the supervision broadcast
//!
//! Actors never share memory. Every cross-actor transfer is a fixed-size
//! record copied through a link, and closing a link is the only
//! end-of-life signal.
//!
//! # Example
//!
//! ```ignore
//! use drone_env::{ArenaContext, LinkReceiver};
//!
//! async fn consumer<Ctx: ArenaContext>(ctx: &Ctx, rx: &mut LinkReceiver<DroneState>) {
//!     loop {
//!         tokio::select! {
//!             state = rx.recv() => match state {
//!                 Ok(s) => handle(s),
//!                 Err(_) => break, // peer gone
//!             },
//!             _ = ctx.sleep(Duration::from_millis(50)) => tick(),
//!         }
//!     }
//! }
//! ```

mod context;
mod error;
mod link;
mod supervision;
mod tokio_impl;
mod types;

pub use context::{stream_seed, ArenaContext};
pub use error::{DecodeError, LinkError};
pub use link::{link, LinkReceiver, LinkSender, DEFAULT_LINK_CAPACITY};
pub use supervision::{
    heartbeat_channel, supervision_channel, Heartbeat, HeartbeatHub, Supervision, SupervisionRx,
};
pub use tokio_impl::TokioContext;
pub use types::{expect_len, PeerId, WireRecord};
