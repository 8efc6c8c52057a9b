//! Vector store gateway.
//!
//! The [`VectorStore`] trait is the collaborator boundary for the vector
//! database: a single collection keyed by chunk id, with a fixed dimension
//! and cosine as the distance metric. Implementations handle the storage
//! details; the pipeline only relies on three operations:
//!
//! * `upsert` — idempotent write; re-upserting an id is a no-op in effect,
//!   since an identical id implies identical content by the hashing contract.
//! * `exists` — batched existence probe powering deduplication.
//! * `similarity_search` — cosine-ranked retrieval with optional metadata
//!   filtering, returning an empty result (never an error) when nothing
//!   matches.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::types::{MetadataFilter, RagError, ScoredSnippet, Vector};

pub use memory::MemoryVectorStore;

/// Collaborator boundary for the vector database.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent write keyed by chunk id.
    async fn upsert(&self, vectors: Vec<Vector>) -> Result<(), RagError>;

    /// Returns the subset of `ids` already present in the store.
    async fn exists(&self, ids: &[String]) -> Result<HashSet<String>, RagError>;

    /// Cosine-ranked retrieval, highest similarity first.
    ///
    /// `filter`, when present, restricts candidates before ranking. Ties are
    /// broken by ascending chunk id so result order is deterministic.
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredSnippet>, RagError>;
}
