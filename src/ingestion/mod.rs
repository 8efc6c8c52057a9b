//! Ingestion-side helpers between raw uploads and the embedding stage.
//!
//! Two concerns live here:
//!
//! * [`extract`] — the text-extraction collaborator boundary and the
//!   extension gate deciding which uploads are processed at all.
//! * [`dedup`] — the pre-embedding existence filter that keeps already
//!   indexed chunks away from the embedding service.

pub mod dedup;
pub mod extract;

pub use dedup::filter_existing;
pub use extract::{DocumentKind, TextExtractor, Utf8Extractor};
