pub mod audio;
pub mod config;
pub mod model;
pub mod scheduling;
pub mod search;
pub mod state_cell;
pub mod ui;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use audio::LoggingAudioPlayer;
use config::SearchConfig;
use model::SearchEvent;
use scheduling::{COMPUTATION_TAG, SchedulerProvider};
use search::{CatalogApi, DefaultSearchService};
use ui::{LoggingNavigator, LoggingTransitionObserver, SearchViewModel, SearchViewModelParts};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "sound-search",
    version,
    about = "Debounced sound search driven from stdin"
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(long, env = "SOUND_SEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed stdin lines as search terms and print every UI state as JSON
    Replay {
        /// JSON array of sounds to search
        #[arg(long)]
        catalog: PathBuf,

        /// Override the debounce window
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Simulated API latency per query
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,

        /// Extra time to wait after EOF before shutting down
        #[arg(long, default_value_t = 100)]
        settle_ms: u64,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            catalog,
            debounce_ms,
            latency_ms,
            settle_ms,
        } => {
            let mut config = SearchConfig::load(cli.config.as_deref())?;
            if let Some(ms) = debounce_ms {
                config.debounce_ms = ms;
            }
            run_replay(
                config,
                catalog,
                Duration::from_millis(latency_ms),
                Duration::from_millis(settle_ms),
            )
            .await
        }
        Commands::Config => {
            let config = SearchConfig::load(cli.config.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "sound-search", &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn run_replay(
    config: SearchConfig,
    catalog: PathBuf,
    latency: Duration,
    settle: Duration,
) -> Result<()> {
    let scheduler = SchedulerProvider::new();
    let api = CatalogApi::from_path(&catalog)?
        .with_latency(latency, scheduler.clock_for(COMPUTATION_TAG));
    info!(sounds = api.len(), catalog = %catalog.display(), "catalog_loaded");

    let parts = SearchViewModelParts {
        search_service: Arc::new(DefaultSearchService::with_capacity(api, config.state_buffer)),
        audio_player: Arc::new(LoggingAudioPlayer::new()),
        navigator: Arc::new(LoggingNavigator),
        transition_observer: Arc::new(LoggingTransitionObserver),
        scheduler,
    };
    let mut view_model = SearchViewModel::new(parts, &config);

    let mut updates = view_model.observe_ui_state();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(ui) = updates.recv().await {
            let mut line = serde_json::to_string(&ui)?;
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
        }
        stdout.flush().await?;
        anyhow::Ok(())
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        view_model.submit_event(SearchEvent::TermChanged(line))?;
    }

    tokio::time::sleep(config.debounce() + latency + settle).await;
    view_model.dispose().await?;
    // Dropping the view-model closes the UI stream and ends the printer.
    drop(view_model);
    printer.await.context("printer task")??;
    Ok(())
}
