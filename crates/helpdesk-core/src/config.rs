use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HelpdeskError, Result};
use crate::types::{Taxonomy, TaxonomyPreset};

/// Top-level configuration for the helpdesk service.
///
/// Loaded from `~/.helpdesk/config.toml` by default. Every section falls back
/// to its defaults, so a partial file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelpdeskConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
}

impl HelpdeskConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HelpdeskConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the configuration as pretty TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Data directory with a leading `~` expanded.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }

    /// Corpus file path; relative paths are resolved against the data directory.
    pub fn corpus_path(&self) -> PathBuf {
        let file = expand_home(&self.corpus.file);
        if file.is_absolute() {
            file
        } else {
            self.data_dir().join(file)
        }
    }

    /// Build the classification taxonomy from the `[taxonomy]` section.
    pub fn taxonomy(&self) -> Result<Taxonomy> {
        self.taxonomy.build()
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the corpus file and local models.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.helpdesk/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Maximum API requests per second. `0` disables the limit.
    pub rate_limit_per_sec: u64,
    /// Optional directory of static frontend files served at `/`.
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
            rate_limit_per_sec: 100,
            static_dir: None,
        }
    }
}

/// Ticket corpus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// JSON file holding the ticket array.
    pub file: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            file: "tickets.json".to_string(),
        }
    }
}

/// Which embedding backend to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// Sentence-transformer ONNX model.
    #[default]
    Onnx,
    /// Deterministic hashing embedder, no model required.
    Mock,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    /// Model identifier, informational.
    pub model_name: String,
    /// Directory containing `model.onnx` and `tokenizer.json`.
    /// Relative paths are resolved against the data directory.
    pub model_dir: String,
    /// Embedding dimension.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Onnx,
            model_name: "all-MiniLM-L6-v2".to_string(),
            model_dir: "models/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Results returned when a request omits `limit`.
    pub default_limit: usize,
    /// Upper bound on `limit`.
    pub max_limit: usize,
    /// Similar tickets attached to a classification response.
    pub similar_tickets: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            max_limit: 50,
            similar_tickets: 5,
        }
    }
}

/// Classification taxonomy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    pub preset: TaxonomyPreset,
    /// Explicit labels; when non-empty they replace the preset.
    pub categories: Vec<String>,
}

impl TaxonomyConfig {
    pub fn build(&self) -> Result<Taxonomy> {
        if self.categories.is_empty() {
            Ok(Taxonomy::from_preset(self.preset))
        } else {
            Taxonomy::new(self.categories.iter().cloned())
                .map_err(|e| HelpdeskError::Config(format!("[taxonomy] {}", e)))
        }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}
