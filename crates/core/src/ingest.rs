use crate::chunking::{chunk_document, ChunkingConfig};
use crate::error::IngestError;
use crate::extract::{PlainTextExtractor, SourceKind, TextExtractor};
use crate::models::{Chunk, Document, IngestionReport, SkippedFile};
use crate::normalize::normalize;
use crate::providers::ModelProvider;
use crate::sections::extract_sections;
use crate::store::VectorStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub fn build_document(title: &str, raw_text: &str, url: Option<String>) -> Document {
    let content = normalize(raw_text);
    let sections = extract_sections(&content);
    Document {
        title: title.to_string(),
        content,
        url,
        sections,
    }
}

pub fn ingest_document(
    title: &str,
    raw_text: &str,
    url: Option<String>,
    source: &str,
    namespace: Option<&str>,
    config: &ChunkingConfig,
) -> Vec<Chunk> {
    let document = build_document(title, raw_text, url);
    chunk_document(&document, config, source, namespace)
}

pub struct IngestPipeline {
    store: Arc<VectorStore>,
    provider: Arc<dyn ModelProvider>,
    chunking: ChunkingConfig,
}

impl IngestPipeline {
    pub fn new(store: Arc<VectorStore>, provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            store,
            provider,
            chunking: ChunkingConfig::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub async fn ingest_files(
        &self,
        paths: &[PathBuf],
        source: &str,
        namespace: Option<&str>,
    ) -> Result<IngestionReport, IngestError> {
        if paths.is_empty() {
            return Err(IngestError::InvalidArgument(
                "no input files given".to_string(),
            ));
        }

        let mut report = IngestionReport::begin();

        for path in paths {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let kind = SourceKind::from_path(path);
                    let extracted = PlainTextExtractor.extract(&bytes, kind);

                    if extracted.text.trim().is_empty() {
                        let reason = extracted
                            .trace
                            .unwrap_or_else(|| "no usable text extracted".to_string());
                        warn!(path = %path.display(), %reason, "skipping file");
                        report.skipped_files.push(SkippedFile {
                            path: path.clone(),
                            reason,
                        });
                        continue;
                    }

                    let title = document_title(path);
                    self.ingest_text(&title, &extracted.text, None, source, namespace, &mut report)
                        .await;
                    report.files_processed += 1;
                }
                Err(error) => {
                    warn!(path = %path.display(), "unreadable file: {error}");
                    report.skipped_files.push(SkippedFile {
                        path: path.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        report.finish();
        info!(
            batch = %report.batch_id,
            files = report.files_processed,
            chunks_succeeded = report.chunks_succeeded,
            chunks_failed = report.chunks_failed,
            skipped = report.skipped_files.len(),
            "ingestion batch complete"
        );
        Ok(report)
    }

    /// Chunks one document, then embeds and inserts sequentially in chunk
    /// order. A failed embedding is counted and the batch continues.
    pub async fn ingest_text(
        &self,
        title: &str,
        raw_text: &str,
        url: Option<String>,
        source: &str,
        namespace: Option<&str>,
        report: &mut IngestionReport,
    ) {
        let chunks = ingest_document(title, raw_text, url, source, namespace, &self.chunking);
        report.chunks_total += chunks.len();

        for mut chunk in chunks {
            match self.provider.embed(&chunk.content).await {
                Ok(embedding) => {
                    chunk.embedding = embedding;
                    self.store.add(chunk);
                    report.chunks_succeeded += 1;
                }
                Err(error) => {
                    warn!(chunk = %chunk.id, "embedding failed: {error}");
                    report.chunks_failed += 1;
                    report.errors.push(format!("{title} ({}): {error}", chunk.id));
                }
            }
        }
    }
}

fn document_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("untitled")
        .to_string()
}
