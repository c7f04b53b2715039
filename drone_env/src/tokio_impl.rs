//! Production implementation of ArenaContext using Tokio.

use crate::context::{stream_seed, ArenaContext};
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Production context backed by Tokio and the system clock.
///
/// Randomness comes from OS entropy unless a seed is given, in which case
/// generator batches are reproducible while time stays real.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Master seed (0 = OS entropy)
    seed: u64,
}

impl TokioContext {
    /// Creates a new unseeded TokioContext.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Creates a TokioContext whose random streams derive from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            start: Instant::now(),
            seed,
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::with_seed(seed))
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArenaContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tracing::debug!(task = name, "spawning task");
        tokio::spawn(future)
    }

    fn rng(&self, stream: u64) -> ChaCha8Rng {
        if self.seed == 0 {
            ChaCha8Rng::from_entropy()
        } else {
            ChaCha8Rng::seed_from_u64(stream_seed(self.seed, stream))
        }
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
