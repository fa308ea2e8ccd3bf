//! Collapses concurrent identical operations into one execution.
//!
//! When many callers miss on the same key at the same moment, running the
//! load once is both correct and kind to the backing source. A
//! [`FlightGroup`] keys every in-flight computation; the first caller for a
//! key becomes the representative and runs the computation, every other
//! caller parks until it finishes, and all of them receive a clone of the
//! identical outcome. The key is retired as soon as the flight completes,
//! so a later call computes afresh.
//!
//! ```text
//!   caller 1 ──┐
//!   caller 2 ──┼──► one shared flight ──► compute() runs once
//!   caller 3 ──┘         │
//!                        └──► identical outcome cloned to all three
//! ```
//!
//! There is no timeout: a stuck computation blocks every waiter for that
//! key. If the representative caller is cancelled mid-flight, the next
//! waiter's closure takes over the computation instead of waiting forever.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;

/// Deduplicates concurrent calls per key.
///
/// `T` is the full outcome of the computation; for fallible loads it is
/// typically a `Result`, so waiters share errors exactly as they share
/// successes.
pub struct FlightGroup<T> {
    inflight: Mutex<FxHashMap<String, Arc<OnceCell<T>>>>,
}

impl<T> FlightGroup<T>
where
    T: Clone,
{
    /// Creates an empty flight group.
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(FxHashMap::default()),
        }
    }

    /// Runs `compute` for `key`, collapsing concurrent duplicate calls.
    ///
    /// All callers that overlap with an in-flight computation for the same
    /// key receive a clone of the same outcome. Once the flight finishes
    /// the key is retired, so a subsequent call recomputes.
    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = {
            let mut inflight = self.inflight.lock();
            Arc::clone(inflight.entry(key.to_owned()).or_default())
        };

        let outcome = cell.get_or_init(compute).await.clone();

        // Retire the flight. A newer flight under the same key belongs to
        // someone else, so only remove the cell this call rode on.
        let mut inflight = self.inflight.lock();
        if let Some(current) = inflight.get(key) {
            if Arc::ptr_eq(current, &cell) {
                inflight.remove(key);
            }
        }
        outcome
    }
}

impl<T> Default for FlightGroup<T>
where
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
