//! Embedding backends and text splitting
//!
//! `Embedder` is implemented by the HTTP `EmbeddingClient` (OpenAI, Ollama,
//! Gemini) and by the local `HashEmbedder`.

pub mod client;
pub mod hash;

pub use client::EmbeddingClient;
pub use hash::HashEmbedder;

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Embed errors
#[derive(Error, Debug)]
pub enum EmbedError {
    /// API error from the provider
    #[error("LLM API error: {0}")]
    ApiError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Provider returned a different number of vectors than texts sent
    #[error("Expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },
}

pub type EmbedResult<T> = Result<T, EmbedError>;

/// Turns texts into fixed-size vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in order
    async fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>>;

    /// Length of every returned vector
    fn dimensions(&self) -> usize;

    /// Identifier recorded in snapshot manifests
    fn model_name(&self) -> String;
}

/// Embed a single text
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> EmbedResult<Vec<f32>> {
    let mut vectors = embedder.embed(&[text.to_string()]).await?;
    match vectors.len() {
        1 => Ok(vectors.remove(0)),
        got => Err(EmbedError::CountMismatch { expected: 1, got }),
    }
}

/// Build the embedder selected by configuration
pub fn build_embedder(config: &EmbeddingConfig) -> EmbedResult<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(config.dimensions))),
        _ => Ok(Arc::new(EmbeddingClient::new(config)?)),
    }
}

/// Split text into chunks of at most `chunk_size` whitespace-separated words,
/// consecutive chunks sharing `chunk_overlap` words.
pub fn split_words(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= chunk_size || chunk_size == 0 {
        return vec![text.trim().to_string()];
    }

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = std::cmp::min(start + chunk_size, words.len());
        chunks.push(words[start..end].join(" "));

        if end == words.len() {
            break;
        }

        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let text = "Name: Alice Smith\nCompany: Acme";
        assert_eq!(split_words(text, 512, 20), vec![text.to_string()]);
    }

    #[test]
    fn test_split_with_overlap() {
        let text = (0..10).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = split_words(&text, 4, 1);
        assert_eq!(chunks, vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]);
    }

    #[test]
    fn test_build_hash_embedder() {
        let embedder = build_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.model_name(), "hash-384");
    }

    #[tokio::test]
    async fn test_embed_one() {
        let embedder = HashEmbedder::new(16);
        let v = embed_one(&embedder, "senior engineer").await.unwrap();
        assert_eq!(v.len(), 16);
    }
}
