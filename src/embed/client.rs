//! Embedding client for hosted and local model providers

use crate::config::{EmbeddingConfig, EmbeddingProvider};
use crate::embed::{EmbedError, EmbedResult, Embedder};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Client for interacting with provider APIs to generate embeddings
pub struct EmbeddingClient {
    client: Client,
    provider: EmbeddingProvider,
    model: String,
    api_key: Option<String>,
    api_base_url: String,
    dimensions: usize,
}

impl EmbeddingClient {
    /// Create a new embedding client based on configuration
    pub fn new(config: &EmbeddingConfig) -> EmbedResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EmbedError::ConfigError(e.to_string()))?;

        let api_base_url = config.api_base_url.clone().unwrap_or_else(|| match config.provider {
            EmbeddingProvider::OpenAI => "https://api.openai.com/v1".to_string(),
            EmbeddingProvider::Ollama => "http://localhost:11434".to_string(),
            EmbeddingProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta".to_string(),
            EmbeddingProvider::Hash => String::new(),
        });

        if config.provider == EmbeddingProvider::Hash {
            return Err(EmbedError::ConfigError(
                "the hash provider does not use an HTTP client".to_string(),
            ));
        }

        let api_key = config.api_key.clone().or_else(|| {
            let var = match config.provider {
                EmbeddingProvider::OpenAI => "OPENAI_API_KEY",
                EmbeddingProvider::Gemini => "GEMINI_API_KEY",
                _ => return None,
            };
            std::env::var(var).ok().filter(|k| !k.is_empty())
        });

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model.clone(),
            api_key,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            dimensions: config.dimensions,
        })
    }

    /// Generate embeddings for a batch of texts
    pub async fn generate_embeddings(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("requesting {} embeddings from {}", texts.len(), self.provider);

        let vectors = match self.provider {
            EmbeddingProvider::OpenAI => self.openai_embeddings(texts).await?,
            EmbeddingProvider::Ollama => self.ollama_embeddings(texts).await?,
            EmbeddingProvider::Gemini => self.gemini_embeddings(texts).await?,
            EmbeddingProvider::Hash => {
                return Err(EmbedError::ConfigError("hash provider has no remote endpoint".to_string()))
            }
        };

        if vectors.len() != texts.len() {
            return Err(EmbedError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }

    async fn openai_embeddings(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: &'a [String],
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<OpenAIData>,
        }

        #[derive(Deserialize)]
        struct OpenAIData {
            embedding: Vec<f32>,
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbedError::ConfigError("OpenAI requires an API key (OPENAI_API_KEY)".to_string()))?;

        let url = format!("{}/embeddings", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&OpenAIRequest {
                input: texts,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::ApiError(format!("OpenAI returned {}: {}", status, error_text)));
        }

        let result: OpenAIResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::SerializationError(e.to_string()))?;
        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn ollama_embeddings(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.api_base_url);
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            let resp = self
                .client
                .post(&url)
                .json(&OllamaRequest {
                    model: &self.model,
                    prompt: text,
                })
                .send()
                .await
                .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let error_text = resp.text().await.unwrap_or_default();
                return Err(EmbedError::ApiError(format!("Ollama returned {}: {}", status, error_text)));
            }

            let result: OllamaResponse = resp
                .json()
                .await
                .map_err(|e| EmbedError::SerializationError(e.to_string()))?;
            results.push(result.embedding);
        }

        Ok(results)
    }

    async fn gemini_embeddings(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct GeminiBatchRequest<'a> {
            requests: Vec<GeminiRequest<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiRequest<'a> {
            model: String,
            content: GeminiContent<'a>,
        }

        #[derive(Serialize)]
        struct GeminiContent<'a> {
            parts: Vec<GeminiPart<'a>>,
        }

        #[derive(Serialize)]
        struct GeminiPart<'a> {
            text: &'a str,
        }

        #[derive(Deserialize)]
        struct GeminiBatchResponse {
            embeddings: Vec<GeminiEmbedding>,
        }

        #[derive(Deserialize)]
        struct GeminiEmbedding {
            values: Vec<f32>,
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbedError::ConfigError("Gemini requires an API key (GEMINI_API_KEY)".to_string()))?;

        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.api_base_url, self.model, api_key
        );

        let requests = texts
            .iter()
            .map(|t| GeminiRequest {
                model: format!("models/{}", self.model),
                content: GeminiContent {
                    parts: vec![GeminiPart { text: t }],
                },
            })
            .collect();

        let resp = self
            .client
            .post(&url)
            .json(&GeminiBatchRequest { requests })
            .send()
            .await
            .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::ApiError(format!("Gemini returned {}: {}", status, error_text)));
        }

        let result: GeminiBatchResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::SerializationError(e.to_string()))?;
        Ok(result.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        self.generate_embeddings(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}
