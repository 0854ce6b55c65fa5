use crate::models::{Chunk, ScoredChunk};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Debug, Default)]
pub struct VectorStore {
    chunks: RwLock<Vec<Chunk>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, chunk: Chunk) {
        self.chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(chunk);
    }

    pub fn add_many(&self, chunks: Vec<Chunk>) {
        self.chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(chunks);
    }

    pub fn clear(&self) {
        self.chunks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn clear_namespace(&self, namespace: &str) -> usize {
        let target = namespace.trim();
        let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);
        let before = chunks.len();
        chunks.retain(|chunk| {
            chunk
                .metadata
                .namespace
                .as_deref()
                .map(str::trim)
                .map_or(true, |ns| ns != target)
        });
        let removed = before - chunks.len();
        debug!(namespace = target, removed, "cleared namespace");
        removed
    }

    pub fn count(&self) -> usize {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn count_namespace(&self, namespace: Option<&str>) -> usize {
        match namespace {
            None => self.count(),
            Some(ns) => {
                let target = ns.trim();
                self.chunks
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .filter(|chunk| chunk.metadata.namespace.as_deref().map(str::trim) == Some(target))
                    .count()
            }
        }
    }

    pub fn get_all(&self) -> Vec<Chunk> {
        self.chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn similarity_search(
        &self,
        query: &[f32],
        k: usize,
        threshold: f32,
        namespace: Option<&str>,
    ) -> Vec<ScoredChunk> {
        let chunks = self.chunks.read().unwrap_or_else(PoisonError::into_inner);

        let mut hits: Vec<ScoredChunk> = chunks
            .iter()
            .filter(|chunk| matches_namespace(chunk, namespace))
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(query, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(k);
        hits
    }
}

pub(crate) fn matches_namespace(chunk: &Chunk, namespace: Option<&str>) -> bool {
    match namespace {
        None => true,
        Some(ns) => chunk.metadata.namespace.as_deref().map(str::trim) == Some(ns.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::{cosine_similarity, VectorStore};
    use crate::models::{Chunk, ChunkMetadata};

    fn chunk(id: &str, embedding: Vec<f32>, namespace: Option<&str>) -> Chunk {
        Chunk {
            id: id.to_string(),
            content: format!("content for {id}"),
            embedding,
            metadata: ChunkMetadata {
                source: "uploaded".to_string(),
                title: "Doc".to_string(),
                url: None,
                section: None,
                namespace: namespace.map(str::to_string),
            },
        }
    }

    #[test]
    fn cosine_of_identical_unit_vectors_is_one() {
        let v = vec![0.6f32, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn search_respects_k_and_sorts_descending() {
        let store = VectorStore::new();
        store.add(chunk("a", vec![1.0, 0.0], None));
        store.add(chunk("b", vec![0.9, 0.1], None));
        store.add(chunk("c", vec![0.0, 1.0], None));

        let hits = store.similarity_search(&[1.0, 0.0], 2, 0.0, None);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.id, "a");
        assert_eq!(hits[1].chunk.id, "b");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn search_filters_by_threshold() {
        let store = VectorStore::new();
        store.add(chunk("near", vec![1.0, 0.0], None));
        store.add(chunk("far", vec![0.0, 1.0], None));

        let hits = store.similarity_search(&[1.0, 0.0], 10, 0.5, None);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, "near");
    }

    #[test]
    fn search_filters_by_namespace() {
        let store = VectorStore::new();
        store.add(chunk("acme", vec![1.0, 0.0], Some("acme")));
        store.add(chunk("other", vec![1.0, 0.0], Some("other")));
        store.add(chunk("untagged", vec![1.0, 0.0], None));

        let hits = store.similarity_search(&[1.0, 0.0], 10, 0.0, Some("acme"));

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, "acme");
    }

    #[test]
    fn mismatched_dimensions_score_zero_not_panic() {
        let store = VectorStore::new();
        store.add(chunk("short", vec![1.0], None));
        store.add(chunk("long", vec![1.0, 0.0, 0.0], None));

        let hits = store.similarity_search(&[1.0, 0.0], 10, 0.0, None);

        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.score == 0.0));
    }

    #[test]
    fn clear_namespace_removes_only_matching_chunks() {
        let store = VectorStore::new();
        store.add(chunk("a", vec![1.0], Some("acme")));
        store.add(chunk("b", vec![1.0], Some(" acme ")));
        store.add(chunk("c", vec![1.0], Some("globex")));
        store.add(chunk("d", vec![1.0], None));

        let removed = store.clear_namespace("acme");

        assert_eq!(removed, 2);
        assert_eq!(store.count(), 2);
        let remaining: Vec<String> = store.get_all().into_iter().map(|c| c.id).collect();
        assert_eq!(remaining, vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn clear_namespace_with_blank_name_leaves_untagged_chunks() {
        let store = VectorStore::new();
        store.add(chunk("untagged", vec![1.0], None));

        assert_eq!(store.clear_namespace(""), 0);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn count_namespace_counts_only_tagged_chunks() {
        let store = VectorStore::new();
        store.add(chunk("a", vec![1.0], Some("acme")));
        store.add(chunk("b", vec![1.0], None));

        assert_eq!(store.count_namespace(Some("acme")), 1);
        assert_eq!(store.count_namespace(None), 2);
    }

    #[test]
    fn get_all_returns_a_copy() {
        let store = VectorStore::new();
        store.add(chunk("a", vec![1.0], None));

        let mut copied = store.get_all();
        copied.clear();

        assert_eq!(store.count(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let store = VectorStore::new();
        store.add_many(vec![chunk("a", vec![1.0], None), chunk("b", vec![1.0], None)]);
        store.clear();
        assert_eq!(store.count(), 0);
    }
}
