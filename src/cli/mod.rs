//! Command-line interface for vocalog.
//!
//! Provides commands for recording entries, browsing history and the
//! profile, asking questions over the history, and moving data in and out
//! via the interchange document.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::analysis::{AnalysisClient, HttpAnalysisClient};
use crate::capture::{AudioCaptureController, CaptureContext, ContextTag, FileSource};
use crate::config::{self, BackendKind};
use crate::pipeline::JournalPipeline;
use crate::store::{JournalStore, LocalStore, RemoteStore};

/// vocalog - Voice journal with psychometric analysis
#[derive(Parser, Debug)]
#[command(name = "vocalog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a journal entry from an audio file
    Record {
        /// Path to the recording
        audio: PathBuf,

        /// Context for this entry
        #[arg(short, long, value_enum, default_value = "private")]
        tag: TagArg,

        /// Latitude of a GPS fix, if one is available
        #[arg(long, requires = "lon")]
        lat: Option<f64>,

        /// Longitude of a GPS fix, if one is available
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
    },

    /// List journal entries, most recent first
    Entries {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show the accumulated profile
    Profile,

    /// Ask a question over the journal history
    Ask {
        /// The question
        question: String,
    },

    /// Export entries and profile as one interchange document
    Export {
        /// Output file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import an interchange document
    Import {
        /// Input file
        input: PathBuf,
    },

    /// Delete all entries and the profile
    Wipe {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// CLI flavor of the context tag
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TagArg {
    Home,
    Work,
    Social,
    Private,
}

impl From<TagArg> for ContextTag {
    fn from(arg: TagArg) -> Self {
        match arg {
            TagArg::Home => ContextTag::Home,
            TagArg::Work => ContextTag::Work,
            TagArg::Social => ContextTag::Social,
            TagArg::Private => ContextTag::Private,
        }
    }
}

/// Build the configured store backend
fn build_store() -> Result<Arc<dyn JournalStore>> {
    let config = config::config()?;

    match config.storage.backend {
        BackendKind::Local => Ok(Arc::new(LocalStore::open_default()?)),
        BackendKind::Remote => {
            let base_url = config
                .storage
                .remote_base_url
                .clone()
                .context("Remote backend selected but no base URL configured (VOCALOG_REMOTE_URL or storage.base_url)")?;

            Ok(Arc::new(RemoteStore::new(
                base_url,
                config.storage.user_id.clone(),
                config.storage.api_key.clone(),
            )))
        }
    }
}

/// Build the analysis client from config
fn build_client() -> Result<Arc<dyn AnalysisClient>> {
    let config = config::config()?;
    Ok(Arc::new(HttpAnalysisClient::new(
        config.analysis.base_url.clone(),
        config.analysis.api_key.clone(),
    )))
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Record { audio, tag, lat, lon } => {
                let coordinates = match (lat, lon) {
                    (Some(latitude), Some(longitude)) => Some(crate::domain::Coordinates {
                        latitude,
                        longitude,
                    }),
                    _ => None,
                };

                let context = CaptureContext::capture(tag.into(), coordinates);
                let pipeline = JournalPipeline::new(build_client()?, build_store()?);
                let mut controller = AudioCaptureController::new(FileSource::new(&audio));

                let entry = pipeline
                    .record(&mut controller, &context)
                    .await
                    .with_context(|| format!("Failed to process {}", audio.display()))?;

                println!("Entry {} ({})", entry.id, entry.date_str);
                println!("  Location:  {}", entry.location_name);
                println!("  Sentiment: {:?}", entry.metadata.sentiment);
                println!("  Summary:   {}", entry.metadata.summary);
                if !entry.metadata.extracted_facts.is_empty() {
                    println!("  New facts:");
                    for fact in &entry.metadata.extracted_facts {
                        println!("    - {fact}");
                    }
                }
            }

            Commands::Entries { limit } => {
                let store = build_store()?;
                let entries = store.entries().await;

                if entries.is_empty() {
                    println!("No entries yet.");
                    return Ok(());
                }

                for entry in entries.iter().take(limit) {
                    println!(
                        "{}  {}  [{:?}]  {}",
                        entry.date_str,
                        entry.location_name,
                        entry.metadata.sentiment,
                        entry.metadata.summary
                    );
                }
                println!("({} total)", entries.len());
            }

            Commands::Profile => {
                let store = build_store()?;
                let profile = store.profile().await;

                if profile.core_memories.is_empty() {
                    println!("No profile facts accumulated yet.");
                    return Ok(());
                }

                println!("Core memories ({}):", profile.core_memories.len());
                for fact in &profile.core_memories {
                    println!("  - {fact}");
                }
            }

            Commands::Ask { question } => {
                let pipeline = JournalPipeline::new(build_client()?, build_store()?);
                println!("{}", pipeline.query_history(&question).await);
            }

            Commands::Export { output } => {
                let store = build_store()?;
                let document = store
                    .export_data()
                    .await
                    .context("Failed to export journal")?;
                let json = serde_json::to_string_pretty(&document)?;

                match output {
                    Some(path) => {
                        tokio::fs::write(&path, json)
                            .await
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!(
                            "Exported {} entries and {} profile facts to {}",
                            document.entries.len(),
                            document.profile.core_memories.len(),
                            path.display()
                        );
                    }
                    None => println!("{json}"),
                }
            }

            Commands::Import { input } => {
                let content = tokio::fs::read_to_string(&input)
                    .await
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                let document: serde_json::Value = serde_json::from_str(&content)
                    .with_context(|| format!("{} is not valid JSON", input.display()))?;

                let store = build_store()?;
                store
                    .import_data(&document)
                    .await
                    .context("Import rejected")?;
                println!("Import applied.");
            }

            Commands::Wipe { yes } => {
                if !yes {
                    anyhow::bail!("This deletes all entries and the profile. Re-run with --yes to confirm.");
                }

                let store = build_store()?;
                store
                    .clear_history()
                    .await
                    .context("Failed to wipe journal")?;
                println!("Journal wiped.");
            }

            Commands::Config => {
                let config = config::config()?;
                println!("Home:          {}", config.home.display());
                println!("Backend:       {:?}", config.storage.backend);
                if let Some(url) = &config.storage.remote_base_url {
                    println!("Remote URL:    {url}");
                }
                println!("User:          {}", config.storage.user_id);
                println!("Analysis URL:  {}", config.analysis.base_url);
                println!(
                    "Analysis key:  {}",
                    if config.analysis.api_key.is_empty() {
                        "(not set)"
                    } else {
                        "(set)"
                    }
                );
                match &config.config_file {
                    Some(path) => println!("Config file:   {}", path.display()),
                    None => println!("Config file:   (none found)"),
                }
            }
        }

        Ok(())
    }
}
