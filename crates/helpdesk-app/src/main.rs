//! Helpdesk application entry point.
//!
//! Loads configuration, builds the embedding provider and the ticket engine,
//! then either serves the HTTP API or runs a one-shot CLI command.

mod cli;

use std::path::PathBuf;

use clap::Parser;

use helpdesk_api::{start_server, AppState};
use helpdesk_core::config::{EmbeddingProviderKind, HelpdeskConfig};
use helpdesk_storage::{write_generated, CorpusStore};
use helpdesk_vector::{MockEmbedding, OnnxEmbeddingService, TicketSearchEngine};

use cli::{CliArgs, Command};

/// Model directory from config; relative paths live under the data directory.
fn model_dir(config: &HelpdeskConfig) -> PathBuf {
    let dir = helpdesk_core::config::expand_home(&config.embedding.model_dir);
    if dir.is_absolute() {
        dir
    } else {
        config.data_dir().join(dir)
    }
}

fn build_engine(config: &HelpdeskConfig) -> helpdesk_core::Result<TicketSearchEngine> {
    let store = CorpusStore::new(config.corpus_path());
    let taxonomy = config.taxonomy()?;

    let mut engine = match config.embedding.provider {
        EmbeddingProviderKind::Onnx => {
            let dir = model_dir(config);
            tracing::info!(
                model = %config.embedding.model_name,
                dir = %dir.display(),
                "Using ONNX embedding provider"
            );
            TicketSearchEngine::new(
                store,
                taxonomy,
                OnnxEmbeddingService::from_directory(&dir, config.embedding.dimensions),
            )
        }
        EmbeddingProviderKind::Mock => {
            tracing::warn!("Using mock embedding provider; rankings are lexical only");
            TicketSearchEngine::new(
                store,
                taxonomy,
                MockEmbedding::with_dimensions(config.embedding.dimensions),
            )
        }
    };

    engine.load()?;
    Ok(engine)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve(config: HelpdeskConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = build_engine(&config)?;

    // Warm-up failures are not fatal: requests retry the build lazily.
    if let Err(e) = engine.warm_up().await {
        tracing::warn!(error = %e, "Startup warm-up failed; embeddings will be built on demand");
    }

    let state = AppState::new(config.clone(), engine);
    start_server(&config, state).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match HelpdeskConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (HelpdeskConfig::default(), Some(e)),
    };
    args.apply_overrides(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting helpdesk v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    match args.command() {
        Command::Serve => serve(config).await?,
        Command::Generate { count, force } => {
            let path = config.corpus_path();
            let tickets = write_generated(&path, count, force)?;
            println!("Wrote {} tickets to {}", tickets.len(), path.display());
        }
        Command::Search { query, limit } => {
            let mut engine = build_engine(&config)?;
            let limit = limit.unwrap_or(config.search.default_limit);
            print_json(&engine.search(&query, limit).await?)?;
        }
        Command::Classify {
            subject,
            description,
        } => {
            let mut engine = build_engine(&config)?;
            print_json(&engine.classify(&subject, &description).await?)?;
        }
        Command::Add {
            subject,
            description,
            category,
        } => {
            let mut engine = build_engine(&config)?;
            print_json(&engine.add(&subject, &description, &category)?)?;
        }
    }

    Ok(())
}
