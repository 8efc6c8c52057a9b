//! ```text
//! Uploaded files ──► pipeline::RagPipeline::ingest
//!                      │
//!                      ├─► blob::BlobStore            (raw bytes kept)
//!                      ├─► ingestion::TextExtractor   (bytes ──► text)
//!                      ├─► chunking::RecursiveChunker (text ──► Chunk, content-addressed ids)
//!                      ├─► ingestion::filter_existing (one exists() probe drops known ids)
//!                      └─► embeddings::EmbeddingBatcher ──► stores::VectorStore::upsert
//!
//! Query text ──► pipeline::RagPipeline::query / query_stream
//!                  │
//!                  ├─► embeddings::EmbeddingProvider  (query vector)
//!                  ├─► stores::VectorStore::similarity_search (cosine + metadata filter)
//!                  └─► answer::Answerer               (schema-checked or streamed answer)
//! ```
//!
pub mod answer;
pub mod blob;
pub mod chunking;
pub mod embeddings;
pub mod ingestion;
pub mod pipeline;
pub mod stores;
pub mod types;

pub use answer::{Answerer, StreamedAnswer};
pub use pipeline::{PipelineConfig, RagPipeline};
pub use types::{
    Answer, Chunk, ContextSnippet, IngestFile, IngestSummary, MetadataFilter, Query, RagError,
};
