//! Normalized entity structs and the search/UI state values.

use serde::{Deserialize, Serialize};

/// A sound returned by the search API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sound {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub preview_url: String,
    #[serde(default)]
    pub duration_secs: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Why a search failed. Kept as plain text so states stay cloneable and comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchFailure {
    pub message: String,
}

impl SearchFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// State published by a search service. Exactly one value is current at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchState {
    Initial,
    Initialized,
    InProgress {
        term: String,
    },
    Success {
        term: String,
        results: Vec<Sound>,
    },
    Error {
        term: String,
        cause: SearchFailure,
    },
}

impl SearchState {
    /// The term this state belongs to, if any.
    pub fn term(&self) -> Option<&str> {
        match self {
            SearchState::Initial | SearchState::Initialized => None,
            SearchState::InProgress { term }
            | SearchState::Success { term, .. }
            | SearchState::Error { term, .. } => Some(term),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchState::Initial => "initial",
            SearchState::Initialized => "initialized",
            SearchState::InProgress { .. } => "in_progress",
            SearchState::Success { .. } => "success",
            SearchState::Error { .. } => "error",
        }
    }
}

/// Dispatch tag for heterogeneous result lists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Sound,
}

/// A rendering-agnostic list entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayableItem {
    pub model: Sound,
    pub kind: ItemKind,
}

impl DisplayableItem {
    pub fn sound(model: Sound) -> Self {
        Self {
            model,
            kind: ItemKind::Sound,
        }
    }
}

/// Renderable snapshot of the search screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UiState {
    pub is_clear_enabled: bool,
    pub in_progress: bool,
    pub items: Option<Vec<DisplayableItem>>,
}

impl UiState {
    /// Structural projection of a search state.
    ///
    /// `items` is only populated for `Success`; the clear button follows the
    /// term the state was produced for.
    pub fn from_search_state(state: &SearchState) -> Self {
        match state {
            SearchState::Initial | SearchState::Initialized => UiState::default(),
            SearchState::InProgress { term } => UiState {
                is_clear_enabled: !term.is_empty(),
                in_progress: true,
                items: None,
            },
            SearchState::Success { term, results } => UiState {
                is_clear_enabled: !term.is_empty(),
                in_progress: false,
                items: Some(results.iter().cloned().map(DisplayableItem::sound).collect()),
            },
            SearchState::Error { term, .. } => UiState {
                is_clear_enabled: !term.is_empty(),
                in_progress: false,
                items: None,
            },
        }
    }
}

/// Events the view layer can submit.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    TermChanged(String),
    TermCleared,
    OpenSoundDetails(Sound),
    TogglePlayback(Sound),
}

/// Output of the debouncer: a query the state machine should act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommittedQuery {
    Search(String),
    Clear,
}

impl CommittedQuery {
    pub fn term(&self) -> &str {
        match self {
            CommittedQuery::Search(term) => term,
            CommittedQuery::Clear => "",
        }
    }
}
