//! Pipeline orchestration: the write path (ingest) and read path (query).
//!
//! The pipeline owns no service state of its own. Every collaborator is an
//! injected handle constructed at process start, and processing is strictly
//! sequential: file by file, then batch by batch. Failures follow the
//! taxonomy on [`RagError`]: per-file problems are logged and skipped,
//! embedding/storage problems abort the rest of the ingestion call while
//! leaving earlier batches persisted, and query-side problems propagate to
//! the caller.

use std::sync::Arc;

use crate::answer::{Answerer, CompletionProvider, StreamedAnswer};
use crate::blob::BlobStore;
use crate::chunking::RecursiveChunker;
use crate::embeddings::{EmbeddingBatcher, EmbeddingProvider};
use crate::ingestion::{DocumentKind, TextExtractor, filter_existing};
use crate::stores::VectorStore;
use crate::types::{
    Answer, Chunk, ContextSnippet, IngestFile, IngestSummary, Query, RagError,
};

/// Request-independent pipeline settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Upper bound on texts per embedding call.
    pub embedding_batch_size: usize,
    /// Candidates retrieved per query.
    pub retrieval_top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            embedding_batch_size: 5,
            retrieval_top_k: 5,
        }
    }
}

/// The ingestion-and-retrieval pipeline, wired to its five collaborators.
pub struct RagPipeline {
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    batcher: EmbeddingBatcher,
    store: Arc<dyn VectorStore>,
    answerer: Answerer,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Ingests a list of uploaded files into the knowledge base.
    ///
    /// Always returns a summary: files that cannot be processed are skipped
    /// and absent from `filenames`, while an embedding or storage abort is
    /// reported through `error_msg` with earlier batches left persisted.
    pub async fn ingest(&self, files: Vec<IngestFile>) -> IngestSummary {
        let mut filenames = Vec::new();
        let mut all_chunks = Vec::new();

        for file in &files {
            match self.process_file(file).await {
                Ok(Some(chunks)) => {
                    filenames.push(file.filename.clone());
                    all_chunks.extend(chunks);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(filename = %file.filename, error = %err, "failed to process file");
                }
            }
        }

        let mut error_msg = None;
        let mut ingested = 0usize;

        let chunks = match filter_existing(self.store.as_ref(), all_chunks).await {
            Ok(fresh) => fresh,
            Err(err) => {
                tracing::error!(error = %err, "existence probe failed, nothing stored");
                error_msg = Some(err.to_string());
                Vec::new()
            }
        };

        if error_msg.is_none() {
            for (index, batch) in self.batcher.batches(&chunks).enumerate() {
                let vectors = match self.batcher.embed_batch(index, batch).await {
                    Ok(vectors) => vectors,
                    Err(err) => {
                        tracing::error!(error = %err, "aborting ingestion, earlier batches remain stored");
                        error_msg = Some(err.to_string());
                        break;
                    }
                };
                if let Err(err) = self.store.upsert(vectors).await {
                    tracing::error!(error = %err, "aborting ingestion, earlier batches remain stored");
                    error_msg = Some(err.to_string());
                    break;
                }
                ingested += batch.len();
            }
        }

        tracing::info!(
            files = filenames.len(),
            chunks = chunks.len(),
            ingested,
            "ingestion finished"
        );

        IngestSummary {
            files_processed: filenames.len(),
            filenames,
            chunks_ingested: ingested,
            chunks,
            error_msg,
        }
    }

    /// Answers a query from retrieved context, single-shot.
    pub async fn query(&self, query: &Query) -> Result<Answer, RagError> {
        let context = self.retrieve(query).await?;
        self.answerer.answer(query.text.trim(), &context).await
    }

    /// Answers a query from retrieved context, streamed.
    ///
    /// Retrieval happens up front; streaming has no side effects on the
    /// vector store and dropping the stream cancels generation.
    pub async fn query_stream(&self, query: &Query) -> Result<StreamedAnswer, RagError> {
        let context = self.retrieve(query).await?;
        self.answerer.answer_stream(query.text.trim(), &context).await
    }

    /// One file through upload, extraction, and chunking.
    ///
    /// `Ok(None)` means the file was skipped before producing chunks: empty
    /// bytes, no usable filename, unsupported extension, or an extraction
    /// that came back empty.
    async fn process_file(&self, file: &IngestFile) -> Result<Option<Vec<Chunk>>, RagError> {
        if file.bytes.is_empty() {
            tracing::warn!(filename = %file.filename, "skipping empty file");
            return Ok(None);
        }

        let filename = file.filename.trim().to_lowercase();
        if filename.is_empty() {
            tracing::warn!("skipping file with no filename");
            return Ok(None);
        }

        let Some(kind) = DocumentKind::from_filename(&filename) else {
            tracing::warn!(filename = %filename, "unsupported format, only pdf and txt are ingested");
            return Ok(None);
        };

        let source_uri = self.blobs.upload(&filename, &file.bytes).await?;
        let text = self.extractor.extract(kind, &file.bytes).await?;
        if text.trim().is_empty() {
            tracing::warn!(filename = %filename, "extraction produced no text");
            return Ok(None);
        }

        let chunker = RecursiveChunker::new(kind.chunker_config());
        let chunks = chunker.chunk(&text, &filename, &source_uri);
        tracing::debug!(filename = %filename, chunks = chunks.len(), "chunked file");
        Ok((!chunks.is_empty()).then_some(chunks))
    }

    /// Embeds the query text and runs the similarity search.
    async fn retrieve(&self, query: &Query) -> Result<Vec<ContextSnippet>, RagError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let embeddings = self.embedder.embed_batch(&[text.to_string()]).await?;
        let embedding = embeddings.into_iter().next().ok_or_else(|| {
            RagError::EmbeddingService("no vector returned for the query text".to_string())
        })?;

        let hits = self
            .store
            .similarity_search(
                &embedding,
                self.config.retrieval_top_k,
                query.metadata_filter.as_ref(),
            )
            .await?;
        tracing::debug!(hits = hits.len(), "similarity search finished");
        Ok(hits.into_iter().map(|hit| hit.snippet).collect())
    }
}

/// Builder wiring the pipeline's collaborators.
#[derive(Default)]
pub struct RagPipelineBuilder {
    blobs: Option<Arc<dyn BlobStore>>,
    extractor: Option<Arc<dyn TextExtractor>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    completions: Option<Arc<dyn CompletionProvider>>,
    config: Option<PipelineConfig>,
}

impl RagPipelineBuilder {
    #[must_use]
    pub fn blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    #[must_use]
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn embedding_provider(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn completion_provider(mut self, completions: Arc<dyn CompletionProvider>) -> Self {
        self.completions = Some(completions);
        self
    }

    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if any collaborator was not provided.
    pub fn build(self) -> RagPipeline {
        self.try_build()
            .expect("RagPipelineBuilder requires blob store, extractor, embedding provider, vector store, and completion provider")
    }

    /// Builds the pipeline, returning `None` if a collaborator is missing.
    pub fn try_build(self) -> Option<RagPipeline> {
        let embedder = self.embedder?;
        let config = self.config.unwrap_or_default();
        Some(RagPipeline {
            blobs: self.blobs?,
            extractor: self.extractor?,
            batcher: EmbeddingBatcher::new(embedder.clone(), config.embedding_batch_size),
            embedder,
            store: self.store?,
            answerer: Answerer::new(self.completions?),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_every_collaborator() {
        assert!(RagPipelineBuilder::default().try_build().is_none());
    }
}
