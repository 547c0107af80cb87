//! Configuration management
//!
//! Manages assistant configuration: model server, retrieval threshold,
//! knowledge store location and the learning prompt.

use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Local model server settings
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Knowledge retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Knowledge store location
    #[serde(default)]
    pub store: StoreConfig,
    /// Learning prompt behaviour
    #[serde(default)]
    pub learning: LearningConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model tag to generate with
    #[serde(default = "default_model")]
    pub model: String,
    /// Fixed system instruction sent with every query
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Sampling temperature (low = more deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Hard cap on generated tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// HTTP timeout for one generation call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_system_prompt() -> String {
    "Eres un asistente útil y conciso. Responde máximo 2 párrafos en español. \
     Sé directo y claro. Responde en 100 palabras máximo."
        .to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_output_tokens() -> u32 {
    120
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a stored answer to be trusted
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

/// Similarity a knowledge match must exceed
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.45;

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite knowledge database
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("knowledge.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Ask for a canonical answer after generated replies
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Pause between showing a generated reply and the learning prompt
    #[serde(default = "default_prompt_delay_ms")]
    pub prompt_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_prompt_delay_ms() -> u64 {
    1000
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prompt_delay_ms: default_prompt_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from file, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        let parent = config_path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "quick-assist", "quick-assist")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "quick-assist", "quick-assist")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration ({})", config_path()?.display());
    println!();
    println!("  Model server:     {}", config.generation.base_url);
    println!("  Model:            {}", config.generation.model);
    println!("  Temperature:      {}", config.generation.temperature);
    println!("  Max tokens:       {}", config.generation.max_output_tokens);
    println!("  Timeout:          {}s", config.generation.timeout_secs);
    println!("  Similarity:       > {}", config.retrieval.similarity_threshold);
    println!("  Knowledge store:  {}", config.store.database_path.display());
    println!("  Learning prompt:  {}", if config.learning.enabled { "Enabled" } else { "Disabled" });
    println!("  Prompt delay:     {}ms", config.learning.prompt_delay_ms);

    Ok(())
}

/// Reset configuration to defaults
pub fn reset_config() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults.");
    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
