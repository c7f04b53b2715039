//! Core environment context trait for arena actors.

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The central interface for environment interaction.
///
/// This trait abstracts the "real world" so that the arena actors can run
/// against the wall clock (tokio) or against a manually advanced virtual
/// clock in tests.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, OS entropy
/// - **Simulation**: `SimContext` - virtual clock, `ChaCha8Rng(seed)`
///
/// # Determinism
///
/// All methods that would normally introduce non-determinism
/// (time, randomness) are controlled by the implementation.
#[async_trait]
pub trait ArenaContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// The watchdog measures heartbeat ages against this clock.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock and yields
    async fn sleep(&self, duration: Duration);

    /// Spawns a named background task on the runtime.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;

    /// Returns a random number generator for the given stream.
    ///
    /// Seeded contexts derive the generator from the master seed and
    /// `stream`, so each generator agent gets an independent but
    /// reproducible sequence.
    fn rng(&self, stream: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// Returns 0 when the context draws from OS entropy.
    fn seed(&self) -> u64;
}

/// Mixes a master seed with a stream index.
///
/// Shared by every seeded context so that the same `(seed, stream)` pair
/// always yields the same generator.
pub fn stream_seed(seed: u64, stream: u64) -> u64 {
    seed.wrapping_mul(0x9e3779b97f4a7c15)
        .wrapping_add(stream.wrapping_mul(0x517cc1b727220a95))
}
