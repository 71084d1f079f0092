use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EkphrasisConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IndexConfig {
    pub provider: String,
    /// Pinecone index host, e.g. `poetic-camera-abc123.svc.us-east-1.pinecone.io`.
    pub host: String,
    pub db_path: String,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub background_query: String,
    pub background_top_k: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    pub vision_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 7373,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            model: "text-embedding-004".into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            dimensions: 768,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        let db_path = default_ekphrasis_dir()
            .join("index.db")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "pinecone".into(),
            host: String::new(),
            db_path,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            background_query: "Life Death Eternity Nature Soul Love Time".into(),
            background_top_k: 50,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".into(),
            model: "llama-3.3-70b-versatile".into(),
            vision_model: "meta-llama/llama-4-scout-17b-16e-instruct".into(),
            tts_model: "playai-tts".into(),
            tts_voice: "Celeste-PlayAI".into(),
            temperature: 0.7,
            max_tokens: 200,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Returns `~/.ekphrasis/`
pub fn default_ekphrasis_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ekphrasis")
}

/// Returns the default config file path: `~/.ekphrasis/config.toml`
pub fn default_config_path() -> PathBuf {
    default_ekphrasis_dir().join("config.toml")
}

impl EkphrasisConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EkphrasisConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. API keys are only ever read from
    /// the environment when the config file leaves them unset.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EKPHRASIS_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("EKPHRASIS_INDEX_DB") {
            self.index.db_path = val;
        }
        if let Ok(val) =
            std::env::var("EKPHRASIS_INDEX_HOST").or_else(|_| std::env::var("PINECONE_INDEX_HOST"))
        {
            self.index.host = val;
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        if self.index.api_key.is_none() {
            self.index.api_key = std::env::var("PINECONE_API_KEY").ok();
        }
        if self.generation.api_key.is_none() {
            self.generation.api_key = std::env::var("GROQ_API_KEY").ok();
        }
    }

    /// Resolve the local index path, expanding `~` if needed.
    pub fn resolved_index_path(&self) -> PathBuf {
        expand_tilde(&self.index.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
