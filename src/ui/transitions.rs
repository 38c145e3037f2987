//! Observation hooks for view-model transitions.

use tracing::{debug, warn};

use crate::model::{CommittedQuery, SearchEvent, SearchState, UiState};
use crate::search::SearchError;

/// One step of the view-model's event -> command -> result -> state flow.
#[derive(Debug, Clone, Copy)]
pub enum Transition<'a> {
    Event(&'a SearchEvent),
    Command(&'a CommittedQuery),
    Result(&'a SearchState),
    State(&'a UiState),
    Failure(&'a SearchError),
    Completed,
}

impl Transition<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            Transition::Event(_) => "event",
            Transition::Command(_) => "command",
            Transition::Result(_) => "result",
            Transition::State(_) => "state",
            Transition::Failure(_) => "failure",
            Transition::Completed => "completed",
        }
    }
}

pub trait TransitionObserver: Send + Sync {
    fn on_transition(&self, tag: &str, transition: Transition<'_>);
}

/// Reports every transition through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingTransitionObserver;

impl TransitionObserver for LoggingTransitionObserver {
    fn on_transition(&self, tag: &str, transition: Transition<'_>) {
        match transition {
            Transition::Event(event) => debug!(tag, ?event, "transition_event"),
            Transition::Command(query) => debug!(
                tag,
                clear = matches!(query, CommittedQuery::Clear),
                term = query.term(),
                "transition_command"
            ),
            Transition::Result(state) => debug!(
                tag,
                state = state.kind(),
                term = state.term(),
                "transition_result"
            ),
            Transition::State(ui) => debug!(
                tag,
                clear = ui.is_clear_enabled,
                in_progress = ui.in_progress,
                items = ui.items.as_ref().map(Vec::len),
                "transition_state"
            ),
            Transition::Failure(error) => warn!(tag, error = %error, "transition_failure"),
            Transition::Completed => debug!(tag, "transition_completed"),
        }
    }
}
