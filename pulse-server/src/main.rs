//! PULSE
//!
//! `pulse` binary: run the ingest server, or search, summarise, and push
//! from the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pulse_core::config::PulseConfig;
use pulse_core::persistence::NotificationStore;
use pulse_llm::prompt::PromptTemplate;
use pulse_llm::{Difficulty, InferenceClient};
use pulse_server::{logging, pipeline, router, AppState, PushNotifier};
use tracing::info;

const DEFAULT_CONFIG: &str = "pulse.toml";

/// PULSE CLI
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(about = "Notification ingest, semantic search, and digests")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./pulse.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Bind address, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Rank stored notifications against a query
    Search {
        /// Free-text query
        query: String,
        /// Minimum similarity
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Summarise notifications related to a query
    Digest {
        /// Free-text query
        query: String,
        /// Model tier to use
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,
        /// Minimum similarity for context
        #[arg(short, long)]
        threshold: Option<f64>,
        /// TOML prompt template replacing the built-in one
        #[arg(long)]
        template: Option<PathBuf>,
        /// Also push the summary to the configured endpoint
        #[arg(long)]
        push: bool,
    },
    /// Send a push message
    Push {
        /// Message text
        message: String,
        /// Title, defaults to the configured one
        #[arg(long)]
        title: Option<String>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PulseConfig> {
    let mut config = match path {
        Some(path) => PulseConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            PulseConfig::from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("failed to load {DEFAULT_CONFIG}"))?
        }
        None => PulseConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn build_state(config: &PulseConfig) -> anyhow::Result<AppState> {
    let store = NotificationStore::open(&config.persistence.database, &config.persistence)
        .with_context(|| format!("failed to open {}", config.persistence.database))?;
    let client = InferenceClient::from_config(&config.llm)?;
    Ok(AppState::new(store, Arc::new(client), config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose)?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(&config).await
        }
        Command::Search { query, threshold } => {
            let state = build_state(&config)?;
            let threshold = threshold.unwrap_or(config.retrieval.threshold);
            let results = pipeline::search(&state, &query, threshold).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Command::Digest {
            query,
            difficulty,
            threshold,
            template,
            push,
        } => {
            let state = build_state(&config)?;
            let template = match template {
                Some(path) => PromptTemplate::from_file(path)?,
                None => PromptTemplate::builtin_digest(),
            };
            let threshold = threshold.unwrap_or(config.retrieval.threshold);
            let digest =
                pipeline::digest(&state, &template, &query, threshold, difficulty).await?;
            println!("{}", serde_json::to_string_pretty(&digest)?);

            if push {
                let notifier = PushNotifier::from_config(&config.push)?;
                if !notifier.send(None, &digest.summary).await {
                    anyhow::bail!("push delivery failed");
                }
            }
            Ok(())
        }
        Command::Push { message, title } => {
            let notifier = PushNotifier::from_config(&config.push)?;
            if !notifier.is_enabled() {
                anyhow::bail!("push.url is not configured");
            }
            if !notifier.send(title.as_deref(), &message).await {
                anyhow::bail!("push delivery failed");
            }
            Ok(())
        }
    }
}

async fn serve(config: &PulseConfig) -> anyhow::Result<()> {
    let state = build_state(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, database = %config.persistence.database, "PULSE server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
