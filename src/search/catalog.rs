//! In-memory sound catalog used as a [`SoundApi`] by the CLI and tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{SearchError, SoundApi};
use crate::model::Sound;
use crate::scheduling::Clock;

pub struct CatalogApi {
    sounds: Vec<Sound>,
    latency: Option<(Duration, Arc<dyn Clock>)>,
}

impl CatalogApi {
    pub fn new(sounds: Vec<Sound>) -> Self {
        Self {
            sounds,
            latency: None,
        }
    }

    /// Load a JSON array of sounds.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let sounds: Vec<Sound> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        Ok(Self::new(sounds))
    }

    /// Delay every answer by `latency`, measured on `clock`.
    pub fn with_latency(mut self, latency: Duration, clock: Arc<dyn Clock>) -> Self {
        self.latency = (!latency.is_zero()).then_some((latency, clock));
        self
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Case-insensitive substring match on name and tags, catalog order.
    pub fn matching(&self, term: &str) -> Vec<Sound> {
        let needle = term.to_lowercase();
        self.sounds
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle)
                    || s.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SoundApi for CatalogApi {
    async fn search(&self, term: &str) -> Result<Vec<Sound>, SearchError> {
        if let Some((latency, clock)) = &self.latency {
            clock.sleep(*latency).await;
        }
        Ok(self.matching(term))
    }
}
