//! Pre-embedding deduplication against the vector store.
//!
//! Embedding calls are the expensive, quota-limited resource in the write
//! path, so this filter runs strictly before any of them. Because chunk ids
//! are content-addressed, an id match is treated as content identity and no
//! payload comparison is performed.

use crate::stores::VectorStore;
use crate::types::{Chunk, RagError};

/// Drops chunks whose id already exists in the store.
///
/// Runs one batched existence probe for the whole input and preserves the
/// relative order of the survivors.
pub async fn filter_existing(
    store: &dyn VectorStore,
    chunks: Vec<Chunk>,
) -> Result<Vec<Chunk>, RagError> {
    if chunks.is_empty() {
        return Ok(chunks);
    }

    let ids: Vec<String> = chunks.iter().map(|chunk| chunk.id.clone()).collect();
    let existing = store.exists(&ids).await?;
    if existing.is_empty() {
        return Ok(chunks);
    }

    let before = chunks.len();
    let fresh: Vec<Chunk> = chunks
        .into_iter()
        .filter(|chunk| !existing.contains(&chunk.id))
        .collect();
    tracing::debug!(
        skipped = before - fresh.len(),
        remaining = fresh.len(),
        "dropped already-indexed chunks before embedding"
    );
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryVectorStore;
    use crate::types::{Vector, VectorMetadata};

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: text.to_string(),
            filename: "doc.txt".to_string(),
            source_uri: "mem://bucket/doc.txt".to_string(),
        }
    }

    fn vector(id: &str) -> Vector {
        Vector {
            id: id.to_string(),
            embedding: vec![1.0, 0.0],
            metadata: VectorMetadata {
                text: "stored".to_string(),
                filename: "doc.txt".to_string(),
                source_uri: "mem://bucket/doc.txt".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn drops_only_known_ids_and_keeps_order() {
        let store = MemoryVectorStore::new(2);
        store.upsert(vec![vector("b")]).await.unwrap();

        let survivors = filter_existing(
            &store,
            vec![chunk("a", "one"), chunk("b", "two"), chunk("c", "three")],
        )
        .await
        .unwrap();

        let ids: Vec<_> = survivors.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let store = MemoryVectorStore::new(2);
        let survivors = filter_existing(&store, Vec::new()).await.unwrap();
        assert!(survivors.is_empty());
    }
}
