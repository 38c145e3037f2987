use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{SearchError, SearchService};
use crate::model::{SearchFailure, SearchState, Sound};
use crate::state_cell::{DEFAULT_STATE_BUFFER, StateCell, StateSubscription};

/// Backend that actually answers queries (HTTP API, local catalog, ...).
#[async_trait]
pub trait SoundApi: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<Sound>, SearchError>;
}

/// [`SearchService`] that reports progress of each query on a replay-latest
/// state stream. API failures become [`SearchState::Error`] and are never
/// returned to the caller.
///
/// Every `search` or `clear` starts a new epoch. A search only reports its
/// outcome while its epoch is still current, so an overtaken query never
/// overwrites a newer state.
pub struct DefaultSearchService<A> {
    api: A,
    states: StateCell<SearchState>,
    epoch: Mutex<u64>,
}

impl<A: SoundApi> DefaultSearchService<A> {
    pub fn new(api: A) -> Self {
        Self::with_capacity(api, DEFAULT_STATE_BUFFER)
    }

    pub fn with_capacity(api: A, capacity: usize) -> Self {
        Self {
            api,
            states: StateCell::new(SearchState::Initial, capacity),
            epoch: Mutex::new(0),
        }
    }

    /// Latest published state.
    pub fn current_state(&self) -> SearchState {
        self.states.get()
    }

    /// Open a new epoch and publish its first state.
    fn begin(&self, state: SearchState) -> u64 {
        let mut epoch = self.epoch.lock();
        *epoch += 1;
        self.publish(state);
        *epoch
    }

    /// Publish `state` unless a newer epoch has started.
    fn report(&self, epoch: u64, state: SearchState) {
        let current = self.epoch.lock();
        if *current != epoch {
            debug!(state = state.kind(), term = state.term(), "search_result_superseded");
            return;
        }
        self.publish(state);
    }

    fn publish(&self, state: SearchState) {
        let kind = state.kind();
        if self.states.publish_if_changed(state) {
            debug!(state = kind, "search_state_published");
        }
    }
}

#[async_trait]
impl<A: SoundApi> SearchService for DefaultSearchService<A> {
    async fn search(&self, term: &str) -> Result<(), SearchError> {
        if term.is_empty() {
            return Err(SearchError::EmptyTerm);
        }
        info!(term = term, "search_start");
        let epoch = self.begin(SearchState::InProgress {
            term: term.to_string(),
        });

        match self.api.search(term).await {
            Ok(results) => {
                info!(term = term, hits = results.len(), "search_done");
                self.report(epoch, SearchState::Success {
                    term: term.to_string(),
                    results,
                });
            }
            Err(e) => {
                warn!(term = term, error = %e, "search_failed");
                self.report(epoch, SearchState::Error {
                    term: term.to_string(),
                    cause: SearchFailure::new(e.to_string()),
                });
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), SearchError> {
        self.begin(SearchState::Initial);
        Ok(())
    }

    fn search_state(&self) -> StateSubscription<SearchState> {
        self.states.subscribe()
    }
}
