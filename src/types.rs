//! Core records and the shared error type for the ingestion/retrieval pipeline.
//!
//! Every inter-component payload is an explicit typed record rather than a
//! loose JSON map, so field presence is a compile-time contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A content-addressed segment of extracted document text.
///
/// The id is a hash of `(filename, text)`, so an identical segment of an
/// identical file always produces the same id across processes and time.
/// That property is what makes deduplication a pure existence check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub filename: String,
    pub source_uri: String,
}

/// Metadata persisted alongside each embedding.
///
/// Echoes the source chunk exactly; it powers citation and metadata
/// filtering at query time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub text: String,
    pub filename: String,
    pub source_uri: String,
}

/// An embedded chunk ready for the vector store.
///
/// `id` matches the source [`Chunk`] id, establishing a 1:1 mapping that is
/// never reused or updated in place: a vector with a known id is assumed
/// already indexed and skipped, not overwritten.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// Metadata field a [`MetadataFilter`] may target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Text,
    Filename,
    SourceUri,
}

/// Comparison applied by a [`MetadataFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
}

/// Predicate restricting similarity search to vectors whose stored metadata
/// matches a `(key, operation, value)` triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub key: FilterKey,
    pub operation: FilterOp,
    pub value: String,
}

impl MetadataFilter {
    /// Returns `true` when `metadata` satisfies this predicate.
    pub fn matches(&self, metadata: &VectorMetadata) -> bool {
        let field = match self.key {
            FilterKey::Text => &metadata.text,
            FilterKey::Filename => &metadata.filename,
            FilterKey::SourceUri => &metadata.source_uri,
        };
        match self.operation {
            FilterOp::Eq => field == &self.value,
            FilterOp::Ne => field != &self.value,
        }
    }
}

/// A natural-language question plus an optional metadata restriction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Accepts `query` on the wire as well, the field name used by common
    /// HTTP front ends.
    #[serde(alias = "query")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_filter: Option<MetadataFilter>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata_filter: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.metadata_filter = Some(filter);
        self
    }
}

/// One piece of retrieved evidence handed to the generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub text: String,
    pub filename: String,
    pub source_uri: String,
}

impl From<VectorMetadata> for ContextSnippet {
    fn from(metadata: VectorMetadata) -> Self {
        Self {
            text: metadata.text,
            filename: metadata.filename,
            source_uri: metadata.source_uri,
        }
    }
}

/// A context snippet paired with its similarity score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredSnippet {
    pub snippet: ContextSnippet,
    pub score: f32,
}

/// Canonical response when retrieval produced nothing to ground an answer on.
pub const NO_CONTEXT_RESPONSE: &str = "I dont have the context to answer that";

/// A grounded, schema-constrained answer.
///
/// `sources` cites only filenames present in the retrieved context that was
/// actually passed to the generator; `confidence` is always in `[0.0, 1.0]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub response: String,
    pub sources: Vec<String>,
    pub confidence: f32,
}

impl Answer {
    /// The fixed answer returned when no context was retrieved.
    pub fn no_context() -> Self {
        Self {
            response: NO_CONTEXT_RESPONSE.to_string(),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// One uploaded file handed to the ingestion pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl IngestFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Outcome of one ingestion request.
///
/// Ingestion reports partial success instead of failing the whole request:
/// files that could not be processed are simply absent from `filenames`, and
/// an embedding/storage abort is carried in `error_msg` while earlier batches
/// stay persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IngestSummary {
    pub files_processed: usize,
    pub filenames: Vec<String>,
    /// Vectors actually upserted by this call (post-dedup, pre-abort).
    pub chunks_ingested: usize,
    /// Post-dedup chunks this call attempted to embed and store.
    pub chunks: Vec<Chunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

/// Error taxonomy for the pipeline.
///
/// Callers decide skip-and-continue vs. abort-and-propagate per variant:
/// extraction/chunking/storage failures are recoverable per file, while
/// embedding, generation, and schema failures abort the current call.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("blob storage failure: {0}")]
    Storage(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("chunking failed: {0}")]
    Chunking(String),

    #[error("embedding service failure: {0}")]
    EmbeddingService(String),

    #[error("embedding batch {batch} failed: {message}")]
    Embedding { batch: usize, message: String },

    #[error("vector store failure: {0}")]
    VectorStore(String),

    #[error("generation call failed: {0}")]
    Generation(String),

    #[error("generation output violated the answer schema: {0}")]
    AnswerSchema(String),

    #[error("query text must not be empty")]
    EmptyQuery,

    #[error("http transport failure: {0}")]
    Http(#[from] reqwest::Error),
}
