//! Search execution seam consumed by the view-model.

pub mod catalog;
pub mod service;

use async_trait::async_trait;

use crate::model::SearchState;
use crate::state_cell::StateSubscription;

pub use catalog::CatalogApi;
pub use service::{DefaultSearchService, SoundApi};

/// Errors a search command can fail with.
///
/// Business failures of a query are reported as [`SearchState::Error`] on the
/// state stream; these errors only describe the command itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("search term must not be empty")]
    EmptyTerm,

    #[error("search api failed: {0}")]
    Api(String),

    #[error("search service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run a query. Progress and results are published on [`search_state`](Self::search_state).
    async fn search(&self, term: &str) -> Result<(), SearchError>;

    /// Drop the current results. Safe to call repeatedly.
    async fn clear(&self) -> Result<(), SearchError>;

    /// Hot, replay-latest stream of search states. Never completes while the
    /// service is alive.
    fn search_state(&self) -> StateSubscription<SearchState>;
}
