//! Chunks, embeds and stores connection documents

use super::loader::ConnectionDocument;
use super::IngestResult;
use crate::config::ChunkingConfig;
use crate::embed::{split_words, EmbedError, Embedder};
use crate::vector::{EmbeddedChunk, VectorStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

struct PendingChunk {
    id: String,
    text: String,
    metadata: BTreeMap<String, String>,
}

pub struct VectorIndexer {
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl VectorIndexer {
    pub fn new(embedder: Arc<dyn Embedder>, chunking: ChunkingConfig, batch_size: usize) -> Self {
        Self {
            embedder,
            chunking,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed every document's chunks into `store`, returning the chunk count
    pub async fn index(&self, documents: &[ConnectionDocument], store: &mut VectorStore) -> IngestResult<usize> {
        let pending: Vec<PendingChunk> = documents.iter().flat_map(|doc| self.chunk(doc)).collect();

        for (batch_no, batch) in pending.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(EmbedError::CountMismatch {
                    expected: batch.len(),
                    got: vectors.len(),
                }
                .into());
            }

            for (chunk, embedding) in batch.iter().zip(vectors) {
                store.insert(EmbeddedChunk {
                    id: chunk.id.clone(),
                    text: chunk.text.clone(),
                    metadata: chunk.metadata.clone(),
                    embedding,
                })?;
            }
            debug!("embedded batch {} ({} chunks)", batch_no, batch.len());
        }

        info!("Indexed {} chunks from {} documents", pending.len(), documents.len());
        Ok(pending.len())
    }

    fn chunk(&self, doc: &ConnectionDocument) -> Vec<PendingChunk> {
        let metadata = doc.metadata();
        split_words(&doc.text, self.chunking.chunk_size, self.chunking.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, text)| PendingChunk {
                id: format!("{}#{}", doc.name, i),
                text,
                metadata: metadata.clone(),
            })
            .collect()
    }
}
