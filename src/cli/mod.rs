//! Command-line interface.
//!
//! - `callwatch watch` - run the ingestion pipeline until Ctrl+C
//! - `callwatch process <file>` - run the same stages once for one file
//! - `callwatch list` - list stored records with optional filtering
//! - `callwatch config` - show resolved configuration

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::ingest::IngestWatcher;
use crate::pipeline::{PipelineConfig, PipelineCoordinator, PipelineOutcome};
use crate::providers::{
    HttpTranscriber, HttpTranslator, NoopTranslator, TranslationProvider,
};
use crate::store::{RecordFilter, RecordStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "callwatch")]
#[command(about = "Watched-folder call recording ingestion and analysis")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the recordings directory and process new files
    Watch,

    /// Process a single recording through the same pipeline stages
    Process {
        /// Path to the audio file
        file: PathBuf,
    },

    /// List stored call records
    List {
        /// Substring filter over filename and transcript
        #[arg(short, long)]
        query: Option<String>,

        /// Filter by record date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,

        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show resolved configuration
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Commands::Watch => execute_watch(&config).await,
            Commands::Process { file } => execute_process(&config, &file).await,
            Commands::List { query, date, limit } => {
                execute_list(&config, query, date, limit).await
            }
            Commands::Config => execute_config(&config),
        }
    }
}

fn build_coordinator(config: &Config) -> Result<Arc<PipelineCoordinator>> {
    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("Failed to open database: {}", config.database.display()))?;

    let transcriber = Arc::new(HttpTranscriber::new(config.speech_endpoint.clone()));

    let translator: Arc<dyn TranslationProvider> = match &config.translate_endpoint {
        Some(endpoint) => Arc::new(HttpTranslator::new(endpoint.clone())),
        None => Arc::new(NoopTranslator),
    };

    Ok(Arc::new(PipelineCoordinator::new(
        PipelineConfig::from(config),
        transcriber,
        translator,
        Arc::new(store),
    )))
}

/// Run the watcher pipeline until Ctrl+C.
async fn execute_watch(config: &Config) -> Result<()> {
    let coordinator = build_coordinator(config)?;
    let watcher = IngestWatcher::new(config.watcher());

    let (events, watch_handle) = watcher.subscribe()?;

    println!("📁 Watching: {}", config.watch_dir.display());
    println!("   Language: {}", config.default_language);
    println!("   Press Ctrl+C to stop");
    println!();

    let pipeline = tokio::spawn(Arc::clone(&coordinator).run(events));

    tokio::signal::ctrl_c().await.ok();
    println!();
    println!("🛑 Stopping watcher...");

    // Releasing the subscription closes the event stream; the pipeline
    // then drains in-flight attempts within the configured grace period.
    watch_handle.stop().await;
    pipeline.await.context("Pipeline task panicked")?;

    println!("✅ Watcher stopped.");
    Ok(())
}

/// One-shot processing of a single file (the manual flow).
async fn execute_process(config: &Config, file: &PathBuf) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let coordinator = build_coordinator(config)?;

    println!("🎙️  Processing: {}", file.display());

    match coordinator.process_file(file).await {
        PipelineOutcome::Recorded { id } => {
            println!("✅ Recorded (id {})", id);
        }
        PipelineOutcome::AlreadyRecorded => {
            println!("⏭️  Already in database, skipped");
        }
        PipelineOutcome::NotAdmitted => {
            println!("⏭️  Already being processed, skipped");
        }
        PipelineOutcome::Failed { reason } => {
            anyhow::bail!("Processing failed: {}", reason);
        }
    }

    Ok(())
}

/// List stored records.
async fn execute_list(
    config: &Config,
    query: Option<String>,
    date: Option<String>,
    limit: usize,
) -> Result<()> {
    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("Failed to open database: {}", config.database.display()))?;

    let filter = RecordFilter {
        query,
        date,
        limit: Some(limit),
    };
    let records = store.search(&filter).await?;

    if records.is_empty() {
        println!("No records found");
        return Ok(());
    }

    println!();
    println!(
        "{:<5} {:<26} {:<24} {:<10} SUMMARY",
        "ID", "FILE", "INTENT", "SENTIMENT"
    );
    println!("{}", "-".repeat(100));

    for record in &records {
        let file = truncate(&record.filename, 24);
        let summary = truncate(&record.analysis.summary, 34);
        println!(
            "{:<5} {:<26} {:<24} {:<10} {}",
            record.id,
            file,
            record.analysis.intent.to_string(),
            record.analysis.sentiment.to_string(),
            summary
        );
    }

    println!();
    println!("  {} record(s)", records.len());

    Ok(())
}

/// Show resolved configuration.
fn execute_config(config: &Config) -> Result<()> {
    println!();
    println!("callwatch configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!("Watch dir:          {}", config.watch_dir.display());
    println!("Database:           {}", config.database.display());
    println!("Default language:   {}", config.default_language);
    println!("Analysis language:  {}", config.analysis_language);
    println!("Settle delay:       {} s", config.settle_delay_secs);
    println!("Stage timeout:      {} s", config.stage_timeout_secs);
    println!("Shutdown grace:     {} s", config.shutdown_grace_secs);
    println!("Speech endpoint:    {}", config.speech_endpoint);
    println!(
        "Translate endpoint: {}",
        config
            .translate_endpoint
            .as_deref()
            .unwrap_or("(none, transcripts analyzed untranslated)")
    );
    println!();

    if config.watch_dir.exists() {
        println!("✓ Watch dir exists");
    } else {
        println!("⚠️  Watch dir does not exist yet (created on `callwatch watch`)");
    }

    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
