//! Turns raw term-change events into committed queries.
//!
//! Terms fall into two partitions, empty and non-empty. Consecutive repeats
//! inside a partition are dropped. Non-empty terms wait out a trailing-edge
//! debounce window; empty terms commit immediately and cancel any pending
//! non-empty commit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::model::CommittedQuery;
use crate::scheduling::Clock;

/// What the policy decided for one raw term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Commit right away (empty terms).
    Immediate(CommittedQuery),
    /// Commit once the window passes without further input.
    Deferred(String),
    /// Repeat of the previous term in the same partition.
    Duplicate,
}

/// Duplicate suppression, independent of time.
#[derive(Debug, Default, Clone)]
pub struct DebouncePolicy {
    last: Option<String>,
}

impl DebouncePolicy {
    pub fn admit(&mut self, term: String) -> Admission {
        // A term equal to the previous one is necessarily in the same partition;
        // switching partitions always changes `last`.
        if self.last.as_deref() == Some(term.as_str()) {
            return Admission::Duplicate;
        }
        self.last = Some(term.clone());
        if term.is_empty() {
            Admission::Immediate(CommittedQuery::Clear)
        } else {
            Admission::Deferred(term)
        }
    }
}

/// A scheduled non-empty commit. Dropping it cancels the timer.
struct PendingCommit {
    term: String,
    generation: u64,
    timer: JoinHandle<()>,
}

impl Drop for PendingCommit {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Debounces term changes on a clock obtained from the scheduler provider.
pub struct QueryDebouncer {
    clock: Arc<dyn Clock>,
    window: Duration,
}

impl QueryDebouncer {
    pub fn new(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self { clock, window }
    }

    /// Run on a new task until `terms` closes or `shutdown` flips.
    pub fn spawn(
        self,
        terms: mpsc::UnboundedReceiver<String>,
        shutdown: watch::Receiver<bool>,
    ) -> (mpsc::UnboundedReceiver<CommittedQuery>, JoinHandle<()>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(self.run(terms, out_tx, shutdown));
        (out_rx, handle)
    }

    async fn run(
        self,
        mut terms: mpsc::UnboundedReceiver<String>,
        out: mpsc::UnboundedSender<CommittedQuery>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let (fire_tx, mut fire_rx) = mpsc::unbounded_channel::<u64>();
        let mut policy = DebouncePolicy::default();
        let mut pending: Option<PendingCommit> = None;
        let mut generation = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                term = terms.recv() => {
                    let Some(term) = term else { break };
                    match policy.admit(term) {
                        Admission::Duplicate => trace!("debounce_duplicate"),
                        Admission::Immediate(query) => {
                            if let Some(stale) = pending.take() {
                                debug!(term = %stale.term, "debounce_cancelled");
                            }
                            if out.send(query).is_err() {
                                break;
                            }
                        }
                        Admission::Deferred(term) => {
                            generation += 1;
                            let sleep = self.clock.sleep(self.window);
                            let fire = fire_tx.clone();
                            let id = generation;
                            let timer = tokio::spawn(async move {
                                sleep.await;
                                let _ = fire.send(id);
                            });
                            trace!(term = %term, "debounce_scheduled");
                            // Replacing drops the previous commit, which aborts its timer.
                            pending = Some(PendingCommit { term, generation, timer });
                        }
                    }
                }
                Some(fired) = fire_rx.recv() => {
                    let Some(commit) = pending.take_if(|p| p.generation == fired) else {
                        continue;
                    };
                    debug!(term = %commit.term, "debounce_committed");
                    if out.send(CommittedQuery::Search(commit.term.clone())).is_err() {
                        break;
                    }
                }
            }
        }
        // `pending` drops here and takes its timer with it.
    }
}
