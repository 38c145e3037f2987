use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use sound_search::audio::{AudioPlayer, PlaybackSource};
use sound_search::config::SearchConfig;
use sound_search::model::{SearchEvent, SearchState, Sound};
use sound_search::scheduling::{DEBOUNCE_TAG, ManualClock, SchedulerProvider};
use sound_search::search::{SearchError, SearchService};
use sound_search::state_cell::{StateCell, StateSubscription};
use sound_search::ui::{
    Navigator, SearchViewModel, SearchViewModelParts, Transition, TransitionObserver,
};

pub const WINDOW_MS: u64 = 250;

/// Let every spawned task run until it blocks again.
pub async fn settle() {
    for _ in 0..128 {
        tokio::task::yield_now().await;
    }
}

/// Poll `cond` in real time until it holds or two seconds pass.
#[allow(dead_code)]
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

#[allow(dead_code)]
pub fn sound(id: u64, name: &str) -> Sound {
    Sound {
        id,
        name: name.to_string(),
        username: "fixture".into(),
        preview_url: format!("https://cdn.example/{id}.mp3"),
        duration_secs: 1.0,
        tags: vec![],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search(String),
    Clear,
}

/// Search service whose state stream is driven by the test.
pub struct FakeSearchService {
    states: StateCell<SearchState>,
    calls: Mutex<Vec<Call>>,
    failure: Mutex<Option<SearchError>>,
}

#[allow(dead_code)]
impl FakeSearchService {
    pub fn new(initial: SearchState) -> Self {
        Self {
            states: StateCell::new(initial, 64),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn emit(&self, state: SearchState) {
        self.states.publish(state);
    }

    pub fn fail_with(&self, error: SearchError) {
        *self.failure.lock() = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Search(term) => Some(term.clone()),
                Call::Clear => None,
            })
            .collect()
    }

    pub fn clear_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Call::Clear))
            .count()
    }

    fn outcome(&self) -> Result<(), SearchError> {
        match self.failure.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SearchService for FakeSearchService {
    async fn search(&self, term: &str) -> Result<(), SearchError> {
        self.calls.lock().push(Call::Search(term.to_string()));
        self.outcome()
    }

    async fn clear(&self) -> Result<(), SearchError> {
        self.calls.lock().push(Call::Clear);
        self.outcome()
    }

    fn search_state(&self) -> StateSubscription<SearchState> {
        self.states.subscribe()
    }
}

/// Search service whose searches park until the test opens the gate.
pub struct GatedSearchService {
    states: StateCell<SearchState>,
    calls: Mutex<Vec<Call>>,
    completed: Mutex<Vec<String>>,
    failure: Mutex<Option<SearchError>>,
    gate: Semaphore,
}

#[allow(dead_code)]
impl GatedSearchService {
    pub fn new() -> Self {
        Self {
            states: StateCell::new(SearchState::Initialized, 64),
            calls: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            gate: Semaphore::new(0),
        }
    }

    /// Let `n` parked searches finish, oldest first.
    pub fn open(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn fail_with(&self, error: SearchError) {
        *self.failure.lock() = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Searches that got past the gate.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl SearchService for GatedSearchService {
    async fn search(&self, term: &str) -> Result<(), SearchError> {
        self.calls.lock().push(Call::Search(term.to_string()));
        self.states.publish(SearchState::InProgress {
            term: term.to_string(),
        });

        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.completed.lock().push(term.to_string());
        if let Some(e) = self.failure.lock().clone() {
            return Err(e);
        }
        self.states.publish(SearchState::Success {
            term: term.to_string(),
            results: vec![sound(term.len() as u64, term)],
        });
        Ok(())
    }

    async fn clear(&self) -> Result<(), SearchError> {
        self.calls.lock().push(Call::Clear);
        self.states.publish(SearchState::Initial);
        Ok(())
    }

    fn search_state(&self) -> StateSubscription<SearchState> {
        self.states.subscribe()
    }
}

#[derive(Debug, Default)]
pub struct AudioLog {
    pub init: usize,
    pub stop: usize,
    pub release: usize,
    pub toggled: Vec<PlaybackSource>,
}

/// Counts every call; asserts nothing arrives after release.
#[derive(Default)]
pub struct RecordingAudioPlayer {
    log: Mutex<AudioLog>,
}

#[allow(dead_code)]
impl RecordingAudioPlayer {
    pub fn init_count(&self) -> usize {
        self.log.lock().init
    }

    pub fn stop_count(&self) -> usize {
        self.log.lock().stop
    }

    pub fn release_count(&self) -> usize {
        self.log.lock().release
    }

    pub fn toggled(&self) -> Vec<PlaybackSource> {
        self.log.lock().toggled.clone()
    }

    fn check_alive(log: &AudioLog) {
        assert_eq!(log.release, 0, "audio player used after release");
    }
}

impl AudioPlayer for RecordingAudioPlayer {
    fn init(&self) {
        self.log.lock().init += 1;
    }

    fn toggle_playback(&self, source: PlaybackSource) {
        let mut log = self.log.lock();
        Self::check_alive(&log);
        log.toggled.push(source);
    }

    fn stop_playback(&self) {
        let mut log = self.log.lock();
        Self::check_alive(&log);
        log.stop += 1;
    }

    fn release(&self) {
        self.log.lock().release += 1;
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    opened: Mutex<Vec<u64>>,
}

#[allow(dead_code)]
impl RecordingNavigator {
    pub fn opened(&self) -> Vec<u64> {
        self.opened.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn open_sound_details(&self, sound: &Sound) {
        self.opened.lock().push(sound.id);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    labels: Mutex<Vec<&'static str>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn labels(&self) -> Vec<&'static str> {
        self.labels.lock().clone()
    }

    pub fn count(&self, label: &str) -> usize {
        self.labels.lock().iter().filter(|l| **l == label).count()
    }
}

impl TransitionObserver for RecordingObserver {
    fn on_transition(&self, _tag: &str, transition: Transition<'_>) {
        self.labels.lock().push(transition.label());
    }
}

/// A view-model wired to fakes, with virtual debounce time.
pub struct Harness<S = FakeSearchService> {
    pub clock: ManualClock,
    pub service: Arc<S>,
    pub audio: Arc<RecordingAudioPlayer>,
    pub navigator: Arc<RecordingNavigator>,
    pub observer: Arc<RecordingObserver>,
    pub view_model: SearchViewModel,
}

#[allow(dead_code)]
impl Harness {
    pub async fn new() -> Self {
        Self::with_initial_state(SearchState::Initialized).await
    }

    pub async fn with_initial_state(initial: SearchState) -> Self {
        Harness::with_service(Arc::new(FakeSearchService::new(initial))).await
    }

    pub async fn emit(&self, state: SearchState) {
        self.service.emit(state);
        settle().await;
    }
}

#[allow(dead_code)]
impl<S: SearchService + 'static> Harness<S> {
    pub async fn with_service(service: Arc<S>) -> Self {
        let clock = ManualClock::new();
        let audio = Arc::new(RecordingAudioPlayer::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let observer = Arc::new(RecordingObserver::default());

        let parts = SearchViewModelParts {
            search_service: service.clone(),
            audio_player: audio.clone(),
            navigator: navigator.clone(),
            transition_observer: observer.clone(),
            scheduler: SchedulerProvider::new().with_clock(DEBOUNCE_TAG, Arc::new(clock.clone())),
        };
        let config = SearchConfig {
            debounce_ms: WINDOW_MS,
            ..SearchConfig::default()
        };
        let view_model = SearchViewModel::new(parts, &config);
        settle().await;

        Self {
            clock,
            service,
            audio,
            navigator,
            observer,
            view_model,
        }
    }

    pub async fn type_term(&self, term: &str) {
        self.view_model
            .submit_event(SearchEvent::TermChanged(term.to_string()))
            .expect("view-model accepts events");
        settle().await;
    }

    pub async fn submit(&self, event: SearchEvent) {
        self.view_model
            .submit_event(event)
            .expect("view-model accepts events");
        settle().await;
    }

    pub async fn advance_ms(&self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
        settle().await;
    }
}
