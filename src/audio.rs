//! Audio preview playback seam.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::model::Sound;

/// What to play: a sound id plus the url of its preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSource {
    pub id: u64,
    pub url: String,
}

impl From<&Sound> for PlaybackSource {
    fn from(sound: &Sound) -> Self {
        Self {
            id: sound.id,
            url: sound.preview_url.clone(),
        }
    }
}

/// A single shared player. Callers are expected to issue commands from one
/// sequence; implementations need no internal ordering guarantees.
pub trait AudioPlayer: Send + Sync {
    fn init(&self);

    /// Play `source`, or pause/resume it if it is already the current source.
    fn toggle_playback(&self, source: PlaybackSource);

    fn stop_playback(&self);

    /// Free the player. No other call is valid afterwards.
    fn release(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Playing,
    Paused,
    Released,
}

#[derive(Debug)]
struct PlayerInner {
    status: PlayerStatus,
    current: Option<PlaybackSource>,
}

/// Player with no audio output. It tracks playback state and reports it via
/// `tracing`; the CLI uses it.
#[derive(Debug)]
pub struct LoggingAudioPlayer {
    inner: Mutex<PlayerInner>,
}

impl Default for LoggingAudioPlayer {
    fn default() -> Self {
        Self {
            inner: Mutex::new(PlayerInner {
                status: PlayerStatus::Idle,
                current: None,
            }),
        }
    }
}

impl LoggingAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> PlayerStatus {
        self.inner.lock().status
    }

    pub fn current(&self) -> Option<PlaybackSource> {
        self.inner.lock().current.clone()
    }
}

impl AudioPlayer for LoggingAudioPlayer {
    fn init(&self) {
        debug!("audio_player_init");
    }

    fn toggle_playback(&self, source: PlaybackSource) {
        let mut inner = self.inner.lock();
        if inner.status == PlayerStatus::Released {
            warn!(id = source.id, "toggle_after_release");
            return;
        }
        let same_source = inner.current.as_ref() == Some(&source);
        let next = match (inner.status, same_source) {
            (PlayerStatus::Playing, true) => PlayerStatus::Paused,
            (PlayerStatus::Paused, true) => PlayerStatus::Playing,
            _ => {
                info!(id = source.id, url = %source.url, "playback_start");
                inner.current = Some(source);
                PlayerStatus::Playing
            }
        };
        inner.status = next;
    }

    fn stop_playback(&self) {
        let mut inner = self.inner.lock();
        if inner.status == PlayerStatus::Released {
            return;
        }
        if let Some(source) = inner.current.take() {
            debug!(id = source.id, "playback_stop");
        }
        inner.status = PlayerStatus::Idle;
    }

    fn release(&self) {
        let mut inner = self.inner.lock();
        if inner.status == PlayerStatus::Released {
            warn!("audio_player_released_twice");
            return;
        }
        inner.current = None;
        inner.status = PlayerStatus::Released;
        debug!("audio_player_released");
    }
}
