//! Replay-latest observable state.
//!
//! A [`StateCell`] has a single logical writer and any number of readers. Each
//! new subscriber first receives the value current at subscription time, then
//! every value published afterwards, in order. Backed by a tokio broadcast
//! channel plus the retained last value.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// Default number of unread values a subscriber may fall behind by.
pub const DEFAULT_STATE_BUFFER: usize = 64;

struct Inner<T> {
    latest: RwLock<T>,
    tx: broadcast::Sender<T>,
}

pub struct StateCell<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for StateCell<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("latest", &*self.inner.latest.read())
            .field("subscribers", &self.inner.tx.receiver_count())
            .finish()
    }
}

impl<T> StateCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell holding `initial`. `capacity` must be non-zero.
    pub fn new(initial: T, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                latest: RwLock::new(initial),
                tx,
            }),
        }
    }

    /// Replace the current value and notify subscribers.
    pub fn publish(&self, value: T) {
        // The write lock spans the send so a concurrent subscribe sees either
        // the old value plus this send, or the new value without it.
        let mut latest = self.inner.latest.write();
        *latest = value.clone();
        let _ = self.inner.tx.send(value);
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.inner.latest.read().clone()
    }

    pub fn subscribe(&self) -> StateSubscription<T> {
        let latest = self.inner.latest.read();
        StateSubscription {
            replay: Some(latest.clone()),
            rx: self.inner.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl<T> StateCell<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Publish only when `value` differs from the current value.
    /// Returns whether anything was published.
    pub fn publish_if_changed(&self, value: T) -> bool {
        let mut latest = self.inner.latest.write();
        if *latest == value {
            return false;
        }
        *latest = value.clone();
        let _ = self.inner.tx.send(value);
        true
    }
}

/// Reader side of a [`StateCell`].
pub struct StateSubscription<T> {
    replay: Option<T>,
    rx: broadcast::Receiver<T>,
}

impl<T> StateSubscription<T>
where
    T: Clone,
{
    /// Next value, or `None` once the cell has been dropped.
    ///
    /// Cancel safe: dropping the future before completion loses nothing.
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.replay.take() {
            return Some(value);
        }
        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "state_subscriber_lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<T> {
        if let Some(value) = self.replay.take() {
            return Some(value);
        }
        loop {
            match self.rx.try_recv() {
                Ok(value) => return Some(value),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "state_subscriber_lagged");
                }
                Err(_) => return None,
            }
        }
    }
}
