//! In-memory [`VectorStore`] implementation.
//!
//! Reference collaborator for tests, demos, and single-process deployments.
//! Not an indexing engine: search is a linear scan over the collection.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{MetadataFilter, RagError, ScoredSnippet, Vector};

use super::VectorStore;

/// Vector collection held in process memory, keyed by chunk id.
pub struct MemoryVectorStore {
    dimensions: usize,
    entries: RwLock<BTreeMap<String, Vector>>,
}

impl MemoryVectorStore {
    /// Creates an empty collection with a fixed embedding dimension.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of vectors currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, vectors: Vec<Vector>) -> Result<(), RagError> {
        for vector in &vectors {
            if vector.embedding.len() != self.dimensions {
                return Err(RagError::VectorStore(format!(
                    "vector {} has dimension {}, collection expects {}",
                    vector.id,
                    vector.embedding.len(),
                    self.dimensions
                )));
            }
        }
        let mut entries = self.entries.write();
        for vector in vectors {
            entries.insert(vector.id.clone(), vector);
        }
        Ok(())
    }

    async fn exists(&self, ids: &[String]) -> Result<HashSet<String>, RagError> {
        let entries = self.entries.read();
        Ok(ids
            .iter()
            .filter(|id| entries.contains_key(*id))
            .cloned()
            .collect())
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredSnippet>, RagError> {
        if query_embedding.len() != self.dimensions {
            return Err(RagError::VectorStore(format!(
                "query has dimension {}, collection expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let entries = self.entries.read();
        let mut scored: Vec<(f32, &Vector)> = entries
            .values()
            .filter(|vector| {
                filter
                    .map(|f| f.matches(&vector.metadata))
                    .unwrap_or(true)
            })
            .map(|vector| (cosine_similarity(query_embedding, &vector.embedding), vector))
            .collect();

        // Descending similarity, ties broken by ascending id.
        scored.sort_by(|(a_score, a), (b_score, b)| {
            b_score.total_cmp(a_score).then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, vector)| ScoredSnippet {
                snippet: vector.metadata.clone().into(),
                score,
            })
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FilterKey, FilterOp, VectorMetadata};

    fn vector(id: &str, embedding: Vec<f32>, filename: &str) -> Vector {
        Vector {
            id: id.to_string(),
            embedding,
            metadata: VectorMetadata {
                text: format!("text of {id}"),
                filename: filename.to_string(),
                source_uri: format!("mem://bucket/{filename}"),
            },
        }
    }

    #[tokio::test]
    async fn upsert_same_id_does_not_grow_the_collection() {
        let store = MemoryVectorStore::new(2);
        store
            .upsert(vec![vector("a", vec![1.0, 0.0], "a.txt")])
            .await
            .unwrap();
        store
            .upsert(vec![vector("a", vec![1.0, 0.0], "a.txt")])
            .await
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn exists_returns_the_stored_subset() {
        let store = MemoryVectorStore::new(2);
        store
            .upsert(vec![
                vector("a", vec![1.0, 0.0], "a.txt"),
                vector("b", vec![0.0, 1.0], "b.txt"),
            ])
            .await
            .unwrap();

        let probe = vec!["a".to_string(), "c".to_string()];
        let found = store.exists(&probe).await.unwrap();
        assert!(found.contains("a"));
        assert!(!found.contains("c"));
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_descending() {
        let store = MemoryVectorStore::new(2);
        store
            .upsert(vec![
                vector("far", vec![0.0, 1.0], "far.txt"),
                vector("near", vec![1.0, 0.0], "near.txt"),
                vector("mid", vec![1.0, 1.0], "mid.txt"),
            ])
            .await
            .unwrap();

        let hits = store
            .similarity_search(&[1.0, 0.0], 3, None)
            .await
            .unwrap();
        let names: Vec<_> = hits.iter().map(|h| h.snippet.filename.as_str()).collect();
        assert_eq!(names, vec!["near.txt", "mid.txt", "far.txt"]);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[tokio::test]
    async fn equal_scores_tie_break_on_id() {
        let store = MemoryVectorStore::new(2);
        store
            .upsert(vec![
                vector("zz", vec![1.0, 0.0], "zz.txt"),
                vector("aa", vec![2.0, 0.0], "aa.txt"),
            ])
            .await
            .unwrap();

        // Cosine ignores magnitude, so both score 1.0 against the query.
        let hits = store
            .similarity_search(&[1.0, 0.0], 2, None)
            .await
            .unwrap();
        let names: Vec<_> = hits.iter().map(|h| h.snippet.filename.as_str()).collect();
        assert_eq!(names, vec!["aa.txt", "zz.txt"]);
    }

    #[tokio::test]
    async fn metadata_filter_restricts_candidates_before_ranking() {
        let store = MemoryVectorStore::new(2);
        store
            .upsert(vec![
                vector("a", vec![1.0, 0.0], "keep.txt"),
                vector("b", vec![1.0, 0.1], "drop.txt"),
            ])
            .await
            .unwrap();

        let filter = MetadataFilter {
            key: FilterKey::Filename,
            operation: FilterOp::Eq,
            value: "keep.txt".to_string(),
        };
        let hits = store
            .similarity_search(&[1.0, 0.0], 5, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].snippet.filename, "keep.txt");

        let nothing = MetadataFilter {
            key: FilterKey::Filename,
            operation: FilterOp::Eq,
            value: "absent.txt".to_string(),
        };
        let hits = store
            .similarity_search(&[1.0, 0.0], 5, Some(&nothing))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_an_error() {
        let store = MemoryVectorStore::new(3);
        let err = store
            .upsert(vec![vector("a", vec![1.0, 0.0], "a.txt")])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::VectorStore(_)));

        let err = store.similarity_search(&[1.0], 1, None).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStore(_)));
    }
}
