//! Correlation-keyed pending responses.
//!
//! An async transformer rule hands its caller a correlation id
//! immediately; the eventual downstream dispatch results complete an
//! entry under that id. Completion and claiming commute: results
//! arriving before anyone waits are held until claimed or until the
//! TTL deadline evicts them, so waiters get a typed timeout instead
//! of hanging.

use crate::router::DispatchResult;
use crate::TransformError;
use parking_lot::Mutex;
use plexus_types::CorrelationId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::debug;

enum State {
    /// A waiter is parked on the channel.
    Waiting(oneshot::Sender<Vec<DispatchResult>>),
    /// Results arrived before anyone waited.
    Ready(Vec<DispatchResult>),
}

struct Entry {
    state: State,
    deadline: Instant,
}

/// Table of async chains and their downstream results.
pub struct PendingResponses {
    default_ttl: Duration,
    entries: Mutex<HashMap<CorrelationId, Entry>>,
}

impl PendingResponses {
    /// Creates an empty table. `default_ttl` bounds how long
    /// unclaimed results are held.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers interest in a correlation id and returns the waiter.
    ///
    /// Results that already arrived resolve the waiter immediately.
    /// A second registration under the same id replaces the first;
    /// the abandoned waiter observes a timeout.
    pub fn register(&self, correlation_id: CorrelationId, ttl: Duration) -> PendingWaiter {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.remove(&correlation_id) {
            if let State::Ready(results) = entry.state {
                return PendingWaiter {
                    correlation_id,
                    ttl,
                    inner: WaiterInner::Immediate(results),
                };
            }
            // A Waiting entry is dropped here, timing out its waiter.
        }

        let (sender, receiver) = oneshot::channel();
        entries.insert(
            correlation_id,
            Entry {
                state: State::Waiting(sender),
                deadline: Instant::now() + ttl,
            },
        );
        PendingWaiter {
            correlation_id,
            ttl,
            inner: WaiterInner::Channel(receiver),
        }
    }

    /// Completes a chain with its downstream results.
    ///
    /// Returns `true` when a parked waiter received them; otherwise
    /// the results are held for a later [`register`](Self::register)
    /// under the default TTL.
    pub fn complete(&self, correlation_id: CorrelationId, results: Vec<DispatchResult>) -> bool {
        let mut entries = self.entries.lock();
        match entries.remove(&correlation_id) {
            Some(Entry {
                state: State::Waiting(sender),
                ..
            }) => sender.send(results).is_ok(),
            existing => {
                // Unclaimed or repeat completion: hold the newest
                // results until claimed or evicted.
                let merged = match existing {
                    Some(Entry {
                        state: State::Ready(mut earlier),
                        ..
                    }) => {
                        earlier.extend(results);
                        earlier
                    }
                    _ => results,
                };
                entries.insert(
                    correlation_id,
                    Entry {
                        state: State::Ready(merged),
                        deadline: Instant::now() + self.default_ttl,
                    },
                );
                false
            }
        }
    }

    /// Evicts every entry past its deadline. Dropping a Waiting
    /// entry's sender resolves the matching waiter with a timeout.
    ///
    /// Returns the number evicted.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.deadline > now);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired pending responses");
        }
        evicted
    }

    /// Number of open entries (waiting or unclaimed).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

enum WaiterInner {
    Immediate(Vec<DispatchResult>),
    Channel(oneshot::Receiver<Vec<DispatchResult>>),
}

/// Handle for awaiting one pending response.
pub struct PendingWaiter {
    correlation_id: CorrelationId,
    ttl: Duration,
    inner: WaiterInner,
}

impl PendingWaiter {
    /// The correlation id this waiter resolves on.
    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Waits for the downstream results.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::PendingTimeout`] when the TTL
    /// elapses or the entry was evicted or replaced first.
    pub async fn wait(self) -> Result<Vec<DispatchResult>, TransformError> {
        let timeout = TransformError::PendingTimeout {
            correlation_id: self.correlation_id,
        };
        match self.inner {
            WaiterInner::Immediate(results) => Ok(results),
            WaiterInner::Channel(receiver) => {
                match tokio::time::timeout(self.ttl, receiver).await {
                    Ok(Ok(results)) => Ok(results),
                    // Sender dropped by eviction or replacement.
                    Ok(Err(_)) => Err(timeout),
                    Err(_) => Err(timeout),
                }
            }
        }
    }
}
