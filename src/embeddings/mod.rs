//! Embedding providers and the batched embedding stage.
//!
//! [`EmbeddingProvider`] is the collaborator boundary for the embedding
//! service; [`EmbeddingBatcher`] bounds external call volume by grouping
//! chunks into fixed-size batches, one call per batch, all-or-nothing per
//! batch.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{Chunk, RagError, Vector, VectorMetadata};

pub use http::HttpEmbeddingProvider;

/// Collaborator boundary for the embedding service.
///
/// A call embeds one bounded-size batch of texts and returns an equal-length
/// sequence of fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Dimension of every vector this provider produces.
    fn dimensions(&self) -> usize;
}

/// Deterministic hash-derived embeddings for tests and demos.
///
/// The same text always maps to the same vector, different texts almost
/// always to different ones, enough structure for exercising the pipeline
/// without a real model.
#[derive(Clone, Copy, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts
            .iter()
            .map(|text| hash_to_vec(text, self.dimensions))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn hash_to_vec(text: &str, dimensions: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..dimensions)
        .map(|i| {
            let bits = seed.rotate_left((i as u32 % 64) * 8) ^ ((i as u64) << 24);
            (bits as f32) / u32::MAX as f32
        })
        .collect()
}

/// Groups chunks into fixed-size batches and obtains their vectors.
///
/// Batches are embedded strictly sequentially; a failing batch aborts with
/// [`RagError::Embedding`] carrying the 1-based batch number, and nothing in
/// that batch is retried piecemeal. Output vector order matches input chunk
/// order within and across batches, and each vector's metadata echoes its
/// chunk exactly.
#[derive(Clone)]
pub struct EmbeddingBatcher {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl EmbeddingBatcher {
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be at least 1");
        Self {
            provider,
            batch_size,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Consecutive groups of at most `batch_size` chunks, in input order.
    pub fn batches<'a>(&self, chunks: &'a [Chunk]) -> std::slice::Chunks<'a, Chunk> {
        chunks.chunks(self.batch_size)
    }

    /// Embeds one batch via a single external call.
    ///
    /// `batch_index` is zero-based; errors report it 1-based.
    pub async fn embed_batch(
        &self,
        batch_index: usize,
        batch: &[Chunk],
    ) -> Result<Vec<Vector>, RagError> {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .provider
            .embed_batch(&texts)
            .await
            .map_err(|err| RagError::Embedding {
                batch: batch_index + 1,
                message: err.to_string(),
            })?;

        if embeddings.len() != batch.len() {
            return Err(RagError::Embedding {
                batch: batch_index + 1,
                message: format!(
                    "provider returned {} vectors for {} texts",
                    embeddings.len(),
                    batch.len()
                ),
            });
        }

        Ok(batch
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Vector {
                id: chunk.id.clone(),
                embedding,
                metadata: VectorMetadata {
                    text: chunk.text.clone(),
                    filename: chunk.filename.clone(),
                    source_uri: chunk.source_uri.clone(),
                },
            })
            .collect())
    }

    /// Embeds all chunks batch by batch, aborting on the first failure.
    pub async fn embed(&self, chunks: &[Chunk]) -> Result<Vec<Vector>, RagError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for (index, batch) in self.batches(chunks).enumerate() {
            vectors.extend(self.embed_batch(index, batch).await?);
            tracing::debug!(batch = index + 1, size = batch.len(), "embedded batch");
        }
        Ok(vectors)
    }
}
