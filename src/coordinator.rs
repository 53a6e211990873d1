//! Admission control for query pipelines
//!
//! At most `limit` pipelines run at once. Extra requests wait for a slot in
//! arrival order instead of being rejected: the underlying semaphore hands out
//! permits first-come, first-served.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use crate::error::{BridgeError, Result};
use crate::types::request::QueryRequest;

/// Bounds the number of concurrently running pipelines
#[derive(Clone)]
pub struct Coordinator {
    permits: Arc<Semaphore>,
    limit: usize,
    in_flight: Arc<AtomicUsize>,
    waiting: Arc<AtomicUsize>,
}

impl Coordinator {
    /// Create a coordinator admitting at most `limit` pipelines
    ///
    /// # Errors
    /// Returns `BridgeError::InvalidConfig` if `limit` is zero
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(BridgeError::invalid_config(
                "admission limit must be at least 1",
            ));
        }
        Ok(Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: Arc::new(AtomicUsize::new(0)),
            waiting: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Run `work` for `request` once a slot is free
    ///
    /// The slot is held until `work` finishes (or its future is dropped).
    pub async fn submit<F, Fut, T>(&self, request: &QueryRequest, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let queued = SlotGuard::enter(&self.waiting);
        // The semaphore is never closed, so this always yields a permit
        let _permit = Arc::clone(&self.permits).acquire_owned().await.ok();
        drop(queued);
        let _slot = SlotGuard::enter(&self.in_flight);

        log::debug!(
            "[{}] admitted ({}/{} running)",
            request.request_id,
            self.in_flight(),
            self.limit
        );

        work().await
    }

    /// Maximum number of concurrent pipelines
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Pipelines currently running
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Requests waiting for a slot
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("limit", &self.limit)
            .field("in_flight", &self.in_flight())
            .field("waiting", &self.waiting())
            .finish()
    }
}

/// Holds one unit of a counter; released on every exit path
struct SlotGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> SlotGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
