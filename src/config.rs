//! Analyzer configuration
//!
//! Loaded from a YAML file (all sections optional, compiled defaults
//! otherwise), then overridden by CLI flags. Passed explicitly to every
//! component that needs it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    ValidationFailed { field: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Embedding backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local feature hashing, no network
    #[default]
    Hash,
    OpenAI,
    Ollama,
    Gemini,
}

impl EmbeddingProvider {
    pub fn is_remote(&self) -> bool {
        !matches!(self, EmbeddingProvider::Hash)
    }
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EmbeddingProvider::Hash => "hash",
            EmbeddingProvider::OpenAI => "openai",
            EmbeddingProvider::Ollama => "ollama",
            EmbeddingProvider::Gemini => "gemini",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// Model name (e.g. "text-embedding-3-small", "nomic-embed-text")
    pub model: String,
    /// Falls back to OPENAI_API_KEY / GEMINI_API_KEY when unset
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub dimensions: usize,
    /// Texts per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hash,
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            api_base_url: None,
            dimensions: 384,
            batch_size: 64,
        }
    }
}

/// Word-based text splitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 20,
        }
    }
}

/// Retrieval and fusion weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub similarity_top_k: usize,
    /// Semantic candidates scoring below this are dropped
    pub similarity_cutoff: f64,
    /// Used when the vector engine reports no score
    pub default_similarity: f64,
    pub base_score: f64,
    pub industry_bonus: f64,
    pub seniority_bonus: f64,
    /// Case-insensitive title substring that earns the seniority bonus
    pub seniority_marker: String,
    /// Similar profiles returned by a detail lookup
    pub detail_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: 50,
            similarity_cutoff: 0.7,
            default_similarity: 0.5,
            base_score: 1.0,
            industry_bonus: 0.5,
            seniority_bonus: 0.3,
            seniority_marker: "senior".to_string(),
            detail_top_k: 5,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Where snapshots are written and read
    pub data_dir: PathBuf,
    pub embedding: EmbeddingConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load from a YAML file, or compiled defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&text, &path.display().to_string())?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML string (for testing).
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config = Self::parse(yaml, "<string>")?;
        config.validate()?;
        Ok(config)
    }

    fn parse(yaml: &str, origin: &str) -> ConfigResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunking.chunk_size == 0 {
            return Err(invalid("chunking.chunk_size", "must be greater than 0"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(invalid("chunking.chunk_overlap", "must be smaller than chunk_size"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_cutoff) {
            return Err(invalid("retrieval.similarity_cutoff", "must be between 0.0 and 1.0"));
        }
        if !(0.0..=1.0).contains(&self.retrieval.default_similarity) {
            return Err(invalid("retrieval.default_similarity", "must be between 0.0 and 1.0"));
        }
        if self.embedding.dimensions == 0 {
            return Err(invalid("embedding.dimensions", "must be greater than 0"));
        }
        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }
        if self.embedding.provider.is_remote() && self.embedding.model.trim().is_empty() {
            return Err(invalid(
                "embedding.model",
                &format!("provider '{}' requires a model", self.embedding.provider),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}
