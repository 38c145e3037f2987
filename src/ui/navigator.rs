use tracing::info;

use crate::model::Sound;

/// Receives cross-screen navigation intents.
pub trait Navigator: Send + Sync {
    fn open_sound_details(&self, sound: &Sound);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn open_sound_details(&self, sound: &Sound) {
        info!(id = sound.id, name = %sound.name, "open_sound_details");
    }
}
