pub mod types;

pub use types::{
    CommittedQuery, DisplayableItem, ItemKind, SearchEvent, SearchFailure, SearchState, Sound,
    UiState,
};
