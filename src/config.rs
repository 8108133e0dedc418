use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline tunables, persisted as TOML under `~/.docbuddy/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per query
    pub top_k: usize,
    /// Character budget for the assembled prompt
    pub max_prompt_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Soft cap on chunk length; oversize paragraphs are re-split
    pub max_chunk_chars: Option<usize>,
    /// Concurrent embedding calls during indexing
    pub embed_fanout: usize,
    /// Per-call embedding timeout in milliseconds
    pub embed_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the Ollama instance (embeddings, local generation)
    pub ollama_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model for the local Ollama back end
    pub generate_model: String,
    /// Per-call generation timeout in milliseconds
    pub generate_timeout_ms: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            indexing: IndexingConfig::default(),
            services: ServicesConfig::default(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_prompt_chars: 12_000,
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: Some(1000),
            embed_fanout: 4,
            embed_timeout_ms: 30_000,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://127.0.0.1:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "gemma3:4b".to_string(),
            generate_timeout_ms: 60_000,
        }
    }
}

impl RagConfig {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = RagConfig::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config: RagConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".docbuddy").join("config.toml"))
    }

    /// Embedding call timeout as a Duration
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.indexing.embed_timeout_ms)
    }

    /// Generation call timeout as a Duration
    pub fn generate_timeout(&self) -> Duration {
        Duration::from_millis(self.services.generate_timeout_ms)
    }
}
