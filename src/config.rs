//! Configuration for Driftloop
//!
//! Loaded from an explicit path, ~/.config/driftloop/driftloop.yml, or
//! ./driftloop.yml, falling back to defaults. Every section has defaults so
//! a partial config file is fine.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub ollama: OllamaConfig,
    pub replicate: ReplicateConfig,
    pub storage: StorageConfig,
}

/// Local prompt-expansion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    /// Model used for prompt expansion.
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "gnokit/improve-prompt".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// Remote inference marketplace settings (fallback expansion, image
/// synthesis, captioning).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateConfig {
    pub base_url: String,
    /// Environment variable holding the API token.
    pub api_token_env: String,
    pub timeout_ms: u64,
    /// Delay between prediction status polls.
    pub poll_interval_ms: u64,
    /// Maximum status polls before a prediction is treated as timed out.
    pub max_polls: u32,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.replicate.com".to_string(),
            api_token_env: "REPLICATE_API_TOKEN".to_string(),
            timeout_ms: 120_000,
            poll_interval_ms: 1_000,
            max_polls: 300,
        }
    }
}

/// Artifact output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for persisted prompts, descriptions, and images.
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("driftloop")
                .join("output"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            ollama: OllamaConfig::default(),
            replicate: ReplicateConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/driftloop/driftloop.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./driftloop.yml
        let fallback_config = PathBuf::from(format!("{}.yml", env!("CARGO_PKG_NAME")));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.ollama.base_url.is_empty() {
            eyre::bail!("ollama.base_url must not be empty");
        }
        if self.replicate.base_url.is_empty() {
            eyre::bail!("replicate.base_url must not be empty");
        }
        if self.replicate.max_polls == 0 {
            eyre::bail!("replicate.max_polls must be > 0");
        }
        Ok(())
    }
}
