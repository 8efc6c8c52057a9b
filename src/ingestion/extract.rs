//! Text extraction collaborator boundary.
//!
//! Extraction itself is an external concern; this module pins down the
//! interface and the extension gate. Only `.pdf` and `.txt` uploads are
//! recognized; everything else is rejected before any processing happens.

use async_trait::async_trait;

use crate::chunking::ChunkerConfig;
use crate::types::RagError;

/// Recognized document classes, derived from the filename extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Classifies a filename, case-insensitively. `None` means the upload is
    /// unsupported and must be skipped without touching any collaborator.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lowered = filename.trim().to_lowercase();
        if lowered.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lowered.ends_with(".txt") {
            Some(Self::PlainText)
        } else {
            None
        }
    }

    /// Chunker settings for this document class. Extracted-PDF text gets the
    /// larger size/overlap because extraction flattens paragraph structure.
    pub fn chunker_config(&self) -> ChunkerConfig {
        match self {
            Self::Pdf => ChunkerConfig::pdf(),
            Self::PlainText => ChunkerConfig::plain_text(),
        }
    }
}

/// Turns raw file bytes into plain text.
///
/// Implementations may call out to external tooling (PDF parsing lives
/// behind this seam). An extraction failure is a per-file error: the
/// pipeline logs it, skips the file, and carries on.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, kind: DocumentKind, bytes: &[u8]) -> Result<String, RagError>;
}

/// Strict UTF-8 extractor for plain text uploads.
///
/// PDF bytes are out of its reach and report as an extraction failure;
/// wire a PDF-capable [`TextExtractor`] for that class.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Extractor;

#[async_trait]
impl TextExtractor for Utf8Extractor {
    async fn extract(&self, kind: DocumentKind, bytes: &[u8]) -> Result<String, RagError> {
        match kind {
            DocumentKind::PlainText => String::from_utf8(bytes.to_vec())
                .map_err(|err| RagError::Extraction(err.to_string())),
            DocumentKind::Pdf => Err(RagError::Extraction(
                "Utf8Extractor cannot read PDF bytes".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_gate_is_case_insensitive() {
        assert_eq!(
            DocumentKind::from_filename("Report.PDF"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_filename("notes.txt"),
            Some(DocumentKind::PlainText)
        );
        assert_eq!(DocumentKind::from_filename("photo.png"), None);
        assert_eq!(DocumentKind::from_filename("no_extension"), None);
    }

    #[test]
    fn kinds_map_to_their_chunker_profiles() {
        assert_eq!(DocumentKind::Pdf.chunker_config(), ChunkerConfig::pdf());
        assert_eq!(
            DocumentKind::PlainText.chunker_config(),
            ChunkerConfig::plain_text()
        );
    }

    #[tokio::test]
    async fn utf8_extractor_decodes_text_and_rejects_pdf() {
        let extractor = Utf8Extractor;

        let text = extractor
            .extract(DocumentKind::PlainText, "hello world".as_bytes())
            .await
            .unwrap();
        assert_eq!(text, "hello world");

        let invalid = extractor
            .extract(DocumentKind::PlainText, &[0xff, 0xfe, 0x00])
            .await;
        assert!(matches!(invalid, Err(RagError::Extraction(_))));

        let pdf = extractor.extract(DocumentKind::Pdf, b"%PDF-1.7").await;
        assert!(matches!(pdf, Err(RagError::Extraction(_))));
    }
}
