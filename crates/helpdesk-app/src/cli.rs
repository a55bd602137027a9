//! CLI argument definitions for the helpdesk binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use helpdesk_core::config::HelpdeskConfig;

/// Helpdesk: semantic search and classification for support tickets.
#[derive(Parser, Debug)]
#[command(name = "helpdesk", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Directory holding the ticket corpus and models.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API server (default).
    Serve,
    /// Write a synthetic ticket corpus.
    Generate {
        /// Number of tickets to generate.
        #[arg(short = 'n', long, default_value_t = 50)]
        count: usize,
        /// Overwrite an existing corpus file.
        #[arg(long)]
        force: bool,
    },
    /// Search the corpus and print the ranked tickets as JSON.
    Search {
        query: String,
        /// Number of results (defaults to `search.default_limit`).
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },
    /// Classify a ticket and print the result as JSON.
    Classify {
        #[arg(short, long)]
        subject: String,
        #[arg(short = 'D', long)]
        description: String,
    },
    /// Append a ticket to the corpus.
    Add {
        #[arg(short, long)]
        subject: String,
        #[arg(short = 'D', long)]
        description: String,
        #[arg(short = 'C', long)]
        category: String,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > HELPDESK_CONFIG env var > ~/.helpdesk/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("HELPDESK_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > HELPDESK_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        std::env::var("HELPDESK_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(config_port)
    }

    /// Fold the command-line overrides into a loaded configuration.
    pub fn apply_overrides(&self, config: &mut HelpdeskConfig) {
        config.server.port = self.resolve_port(config.server.port);
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

fn default_config_path() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".helpdesk").join("config.toml"),
        Err(_) => PathBuf::from("config.toml"),
    }
}
