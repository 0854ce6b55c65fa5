use crate::error::RetrievalError;
use crate::models::{
    Chunk, RetrievalConfig, RetrievedContext, ScoredChunk, SourceRef, SOURCE_UPLOADED,
};
use crate::providers::ModelProvider;
use crate::store::{cosine_similarity, matches_namespace, VectorStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const CONTEXT_DIVIDER: &str = "\n\n---\n\n";

pub struct Retriever {
    store: Arc<VectorStore>,
    provider: Arc<dyn ModelProvider>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        store: Arc<VectorStore>,
        provider: Arc<dyn ModelProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    pub async fn retrieve(
        &self,
        question: &str,
        namespace: Option<&str>,
    ) -> Result<RetrievedContext, RetrievalError> {
        let started = Instant::now();
        let query = self.provider.embed(question).await?;

        // synthetic offline embeddings have no calibrated similarity scale
        let threshold = if self.provider.is_offline() {
            0.0
        } else {
            self.config.similarity_threshold
        };

        let hits = self.select_candidates(&query, threshold, namespace);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if hits.is_empty() {
            debug!(elapsed_ms, "retrieval over an empty candidate pool");
            return Ok(RetrievedContext::empty(elapsed_ms));
        }

        let context = format_context(&hits);
        let sources = dedup_sources(&hits);
        let domain_label = domain_label(&hits[0].chunk.metadata.source);

        debug!(
            hits = hits.len(),
            sources = sources.len(),
            elapsed_ms,
            "retrieval complete"
        );

        Ok(RetrievedContext {
            chunks: hits,
            sources,
            domain_label,
            context,
            elapsed_ms,
        })
    }

    fn select_candidates(
        &self,
        query: &[f32],
        threshold: f32,
        namespace: Option<&str>,
    ) -> Vec<ScoredChunk> {
        let all = self.store.get_all();

        // uploaded tenant content always wins over bundled corpora, and the
        // namespace filter does not apply to it
        let uploaded: Vec<&Chunk> = all
            .iter()
            .filter(|chunk| chunk.metadata.source == SOURCE_UPLOADED)
            .collect();
        if !uploaded.is_empty() {
            let mut hits: Vec<ScoredChunk> = uploaded
                .into_iter()
                .map(|chunk| ScoredChunk {
                    score: cosine_similarity(query, &chunk.embedding),
                    chunk: chunk.clone(),
                })
                .collect();
            hits.sort_by(|left, right| right.score.total_cmp(&left.score));
            hits.truncate(self.config.max_results);
            return hits;
        }

        for step in self.threshold_ladder(threshold) {
            let hits =
                self.store
                    .similarity_search(query, self.config.max_results, step, namespace);
            if !hits.is_empty() {
                return hits;
            }
        }

        // the pool is non-empty but nothing cleared even threshold zero;
        // returning nothing here would be a silent failure
        all.iter()
            .filter(|chunk| matches_namespace(chunk, namespace))
            .take(self.config.max_results)
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(query, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect()
    }

    fn threshold_ladder(&self, first: f32) -> Vec<f32> {
        let mut ladder = Vec::with_capacity(1 + self.config.fallback_thresholds.len());
        for step in std::iter::once(first).chain(self.config.fallback_thresholds.iter().copied()) {
            if !(0.0..=1.0).contains(&step) {
                continue;
            }
            if !ladder.iter().any(|seen: &f32| (seen - step).abs() < f32::EPSILON) {
                ladder.push(step);
            }
        }
        ladder
    }
}

fn format_context(hits: &[ScoredChunk]) -> String {
    let blocks: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(index, hit)| {
            let metadata = &hit.chunk.metadata;
            let section = metadata
                .section
                .as_deref()
                .map(|section| format!(" - {section}"))
                .unwrap_or_default();
            format!(
                "[Source {}: {}{}]\n{}",
                index + 1,
                metadata.title,
                section,
                hit.chunk.content
            )
        })
        .collect();

    blocks.join(CONTEXT_DIVIDER)
}

fn dedup_sources(hits: &[ScoredChunk]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for hit in hits {
        let metadata = &hit.chunk.metadata;
        let key = (
            metadata.title.clone(),
            metadata
                .section
                .clone()
                .unwrap_or_else(|| "main".to_string()),
        );
        if seen.insert(key) {
            sources.push(SourceRef {
                title: metadata.title.clone(),
                section: metadata.section.clone(),
            });
        }
    }

    sources
}

fn domain_label(source: &str) -> String {
    if source == SOURCE_UPLOADED {
        "the uploaded documents".to_string()
    } else if source.is_empty() {
        "the provided knowledge base".to_string()
    } else {
        format!("the {source} corpus")
    }
}
