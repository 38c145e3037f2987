//! Named logical clocks.
//!
//! Components ask a [`SchedulerProvider`] for a clock by tag instead of calling
//! `tokio::time` directly, so tests can swap in a [`ManualClock`] per tag.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Clock used for the search debounce window.
pub const DEBOUNCE_TAG: &str = "search.debounce";
/// Clock used for simulated API latency and other background work.
pub const COMPUTATION_TAG: &str = "computation";

pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns a future that resolves once `duration` has elapsed.
    ///
    /// The deadline is fixed when this is called, not when the future is
    /// first polled.
    fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// Wall-clock time via the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn sleep(&self, duration: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}

struct Waiter {
    deadline: Duration,
    wake: oneshot::Sender<()>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    waiters: Vec<Waiter>,
}

/// Virtual clock that only moves when [`advance`](ManualClock::advance) is called.
#[derive(Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Move time forward and wake every sleeper whose deadline has passed.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.now += by;
        let now = state.now;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.waiters)
            .into_iter()
            .partition(|w| w.deadline <= now);
        state.waiters = waiting;
        drop(state);

        for waiter in due {
            let _ = waiter.wake.send(());
        }
    }

    /// Sleepers that are still waiting and have not been dropped.
    pub fn active_timers(&self) -> usize {
        self.state
            .lock()
            .waiters
            .iter()
            .filter(|w| !w.wake.is_closed())
            .count()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualClock")
            .field("now", &state.now)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) -> SleepFuture {
        if duration.is_zero() {
            return Box::pin(std::future::ready(()));
        }
        let (wake, fired) = oneshot::channel();
        let mut state = self.state.lock();
        let deadline = state.now + duration;
        state.waiters.push(Waiter { deadline, wake });
        Box::pin(async move {
            if fired.await.is_err() {
                // Clock dropped; time will never reach the deadline.
                std::future::pending::<()>().await;
            }
        })
    }
}

/// Maps logical clock tags to clocks, with a fallback for unknown tags.
#[derive(Clone)]
pub struct SchedulerProvider {
    clocks: HashMap<String, Arc<dyn Clock>>,
    fallback: Arc<dyn Clock>,
}

impl Default for SchedulerProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerProvider {
    /// Every tag resolves to [`TokioClock`].
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(TokioClock))
    }

    pub fn with_fallback(fallback: Arc<dyn Clock>) -> Self {
        Self {
            clocks: HashMap::new(),
            fallback,
        }
    }

    /// Route `tag` to `clock`.
    pub fn with_clock(mut self, tag: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        self.clocks.insert(tag.into(), clock);
        self
    }

    pub fn clock_for(&self, tag: &str) -> Arc<dyn Clock> {
        match self.clocks.get(tag) {
            Some(clock) => Arc::clone(clock),
            None => Arc::clone(&self.fallback),
        }
    }
}

impl fmt::Debug for SchedulerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.clocks.keys().collect();
        tags.sort();
        f.debug_struct("SchedulerProvider")
            .field("tags", &tags)
            .field("fallback", &self.fallback)
            .finish()
    }
}
