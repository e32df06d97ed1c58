//! Concurrency gate for outbound calls
//!
//! One gate is shared by every worker in a run and bounds how many service
//! calls are in flight at once, independently of the worker pool size.
//! A permit covers exactly one call: callers drop it before any backoff sleep.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// The gate was closed and can no longer grant permits
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("call gate closed")]
pub struct GateClosed;

/// Slot held for the duration of one call; released on drop
pub struct GatePermit {
    _guard: Box<dyn Send>,
}

impl GatePermit {
    pub fn new<G: Send + 'static>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for GatePermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatePermit").finish_non_exhaustive()
    }
}

/// Admission control for outbound calls
#[async_trait]
pub trait CallGate: Send + Sync {
    /// Wait for a free slot
    async fn acquire(&self) -> Result<GatePermit, GateClosed>;

    /// Maximum number of simultaneous permits
    fn capacity(&self) -> usize;
}

/// Counting-semaphore gate
#[derive(Debug, Clone)]
pub struct SemaphoreGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl SemaphoreGate {
    /// A gate with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

#[async_trait]
impl CallGate for SemaphoreGate {
    async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        Ok(GatePermit::new(permit))
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
