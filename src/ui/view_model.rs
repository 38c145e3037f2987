//! The search screen state machine.
//!
//! A [`SearchViewModel`] owns three tasks: the [`QueryDebouncer`], an actor
//! that applies committed queries, search-state emissions and UI actions one
//! at a time, and a call runner that talks to the [`SearchService`]. The runner
//! executes one service call at a time in command order and drops the running
//! call as soon as a newer command arrives, so a superseded call can never
//! finish after its successor. Nothing runs after [`SearchViewModel::dispose`]
//! returns.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::debounce::QueryDebouncer;
use super::navigator::Navigator;
use super::transitions::{Transition, TransitionObserver};
use crate::audio::{AudioPlayer, PlaybackSource};
use crate::config::SearchConfig;
use crate::model::{CommittedQuery, SearchEvent, SearchState, Sound, UiState};
use crate::scheduling::{DEBOUNCE_TAG, SchedulerProvider};
use crate::search::SearchService;
use crate::state_cell::{StateCell, StateSubscription};

pub const VIEW_MODEL_TAG: &str = "SearchViewModel";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewModelError {
    #[error("view-model already disposed")]
    AlreadyDisposed,
    #[error("view-model is disposed; event dropped")]
    Disposed,
}

/// External collaborators of the view-model.
pub struct SearchViewModelParts {
    pub search_service: Arc<dyn SearchService>,
    pub audio_player: Arc<dyn AudioPlayer>,
    pub navigator: Arc<dyn Navigator>,
    pub transition_observer: Arc<dyn TransitionObserver>,
    pub scheduler: SchedulerProvider,
}

/// Non-term events, handled by the actor.
#[derive(Debug)]
enum Action {
    OpenSoundDetails(Sound),
    TogglePlayback(Sound),
}

pub struct SearchViewModel {
    terms: mpsc::UnboundedSender<String>,
    actions: mpsc::UnboundedSender<Action>,
    ui: StateCell<UiState>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    audio: Arc<dyn AudioPlayer>,
    observer: Arc<dyn TransitionObserver>,
    disposed: bool,
}

impl SearchViewModel {
    /// Initialise the audio player and start observing search state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(parts: SearchViewModelParts, config: &SearchConfig) -> Self {
        let SearchViewModelParts {
            search_service,
            audio_player,
            navigator,
            transition_observer,
            scheduler,
        } = parts;

        audio_player.init();

        let ui = StateCell::new(UiState::default(), config.state_buffer);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (terms, terms_rx) = mpsc::unbounded_channel();
        let (actions, actions_rx) = mpsc::unbounded_channel();

        // Subscribe before spawning so the current state is never missed.
        let states = search_service.search_state();

        let debouncer = QueryDebouncer::new(scheduler.clock_for(DEBOUNCE_TAG), config.debounce());
        let (queries, debounce_task) = debouncer.spawn(terms_rx, shutdown_rx.clone());

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let runner = CallRunner {
            service: search_service,
            observer: Arc::clone(&transition_observer),
        };
        let runner_task = tokio::spawn(runner.run(commands_rx, shutdown_rx.clone()));

        let actor = Actor {
            audio: Arc::clone(&audio_player),
            navigator,
            observer: Arc::clone(&transition_observer),
            ui: ui.clone(),
            commands,
            last_committed: None,
        };
        let actor_task = tokio::spawn(actor.run(queries, states, actions_rx, shutdown_rx));

        info!(
            tag = VIEW_MODEL_TAG,
            debounce_ms = config.debounce_ms,
            "view_model_started"
        );

        Self {
            terms,
            actions,
            ui,
            shutdown,
            tasks: vec![debounce_task, actor_task, runner_task],
            audio: audio_player,
            observer: transition_observer,
            disposed: false,
        }
    }

    pub fn submit_event(&self, event: SearchEvent) -> Result<(), ViewModelError> {
        if self.disposed {
            return Err(ViewModelError::Disposed);
        }
        self.observer
            .on_transition(VIEW_MODEL_TAG, Transition::Event(&event));

        let sent = match event {
            SearchEvent::TermChanged(term) => self.terms.send(term).is_ok(),
            SearchEvent::TermCleared => self.terms.send(String::new()).is_ok(),
            SearchEvent::OpenSoundDetails(sound) => {
                self.actions.send(Action::OpenSoundDetails(sound)).is_ok()
            }
            SearchEvent::TogglePlayback(sound) => {
                self.actions.send(Action::TogglePlayback(sound)).is_ok()
            }
        };
        if sent {
            Ok(())
        } else {
            Err(ViewModelError::Disposed)
        }
    }

    /// Replay-latest stream of UI states.
    pub fn observe_ui_state(&self) -> StateSubscription<UiState> {
        self.ui.subscribe()
    }

    /// Latest UI state.
    pub fn ui_state(&self) -> UiState {
        self.ui.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stop every task, drop the in-flight service call, then release the
    /// audio player. Call exactly once.
    pub async fn dispose(&mut self) -> Result<(), ViewModelError> {
        if self.disposed {
            return Err(ViewModelError::AlreadyDisposed);
        }
        self.disposed = true;

        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await
                && e.is_panic()
            {
                error!(tag = VIEW_MODEL_TAG, error = %e, "view_model_task_panicked");
            }
        }

        self.audio.release();
        self.observer
            .on_transition(VIEW_MODEL_TAG, Transition::Completed);
        info!(tag = VIEW_MODEL_TAG, "view_model_disposed");
        Ok(())
    }
}

impl Drop for SearchViewModel {
    fn drop(&mut self) {
        if self.disposed {
            return;
        }
        warn!(tag = VIEW_MODEL_TAG, "view_model_dropped_without_dispose");
        let _ = self.shutdown.send(true);
        for task in &self.tasks {
            task.abort();
        }
    }
}

struct Actor {
    audio: Arc<dyn AudioPlayer>,
    navigator: Arc<dyn Navigator>,
    observer: Arc<dyn TransitionObserver>,
    ui: StateCell<UiState>,
    commands: mpsc::UnboundedSender<CommittedQuery>,
    last_committed: Option<String>,
}

impl Actor {
    async fn run(
        mut self,
        mut queries: mpsc::UnboundedReceiver<CommittedQuery>,
        mut states: StateSubscription<SearchState>,
        mut actions: mpsc::UnboundedReceiver<Action>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut states_open = true;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                state = states.recv(), if states_open => match state {
                    Some(state) => self.on_search_state(state),
                    None => {
                        warn!(tag = VIEW_MODEL_TAG, "search_state_stream_closed");
                        states_open = false;
                    }
                },
                Some(query) = queries.recv() => self.on_committed(query),
                Some(action) = actions.recv() => self.on_action(action),
            }
        }
        debug!(tag = VIEW_MODEL_TAG, "view_model_actor_stopped");
    }

    fn on_search_state(&mut self, state: SearchState) {
        // New results invalidate whatever preview is playing.
        self.audio.stop_playback();
        self.observer
            .on_transition(VIEW_MODEL_TAG, Transition::Result(&state));

        let ui = UiState::from_search_state(&state);
        self.observer
            .on_transition(VIEW_MODEL_TAG, Transition::State(&ui));
        self.ui.publish(ui);
    }

    fn on_committed(&mut self, query: CommittedQuery) {
        if let CommittedQuery::Search(term) = &query
            && self.last_committed.as_deref() == Some(term.as_str())
        {
            debug!(tag = VIEW_MODEL_TAG, term = %term, "search_skipped_same_term");
            return;
        }
        self.last_committed = Some(query.term().to_string());
        self.observer
            .on_transition(VIEW_MODEL_TAG, Transition::Command(&query));
        if self.commands.send(query).is_err() {
            warn!(tag = VIEW_MODEL_TAG, "call_runner_gone");
        }
    }

    fn on_action(&mut self, action: Action) {
        match action {
            Action::OpenSoundDetails(sound) => self.navigator.open_sound_details(&sound),
            Action::TogglePlayback(sound) => {
                self.audio.toggle_playback(PlaybackSource::from(&sound))
            }
        }
    }
}

/// Runs service calls strictly one after another.
struct CallRunner {
    service: Arc<dyn SearchService>,
    observer: Arc<dyn TransitionObserver>,
}

impl CallRunner {
    async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<CommittedQuery>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut next: Option<CommittedQuery> = None;
        loop {
            let query = match next.take() {
                Some(query) => query,
                None => tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    query = commands.recv() => match query {
                        Some(query) => query,
                        None => break,
                    },
                },
            };

            let call = match &query {
                CommittedQuery::Search(term) => self.service.search(term),
                CommittedQuery::Clear => self.service.clear(),
            };
            // Dropping `call` cancels it before the newer command starts.
            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                newer = commands.recv() => {
                    debug!(tag = VIEW_MODEL_TAG, term = query.term(), "service_call_superseded");
                    match newer {
                        Some(newer) => {
                            next = Some(newer);
                            continue;
                        }
                        None => break,
                    }
                }
                outcome = call => outcome,
            };
            if let Err(e) = outcome {
                self.observer
                    .on_transition(VIEW_MODEL_TAG, Transition::Failure(&e));
            }
        }
        debug!(tag = VIEW_MODEL_TAG, "call_runner_stopped");
    }
}
