pub mod chunking;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod retrieval;
pub mod retry;
pub mod sections;
pub mod store;

pub use chunking::{chunk_document, chunk_text, ChunkingConfig};
pub use config::{RagConfig, DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
pub use engine::{AnswerEngine, EMPTY_STORE_ANSWER};
pub use error::{IngestError, ProviderError, RetrievalError};
pub use extract::{ExtractedText, PlainTextExtractor, SourceKind, TextExtractor};
pub use ingest::{build_document, ingest_document, IngestPipeline};
pub use models::{
    AnswerOutcome, Chunk, ChunkMetadata, ChunkPreview, Document, IngestionReport, RetrievalConfig,
    RetrievedContext, ScoredChunk, Section, SkippedFile, SourceRef, SOURCE_UPLOADED,
};
pub use normalize::normalize;
pub use providers::{
    ChatMessage, ModelProvider, OfflineProvider, OpenAiProvider, QuotaFallbackProvider,
    DEFAULT_OFFLINE_DIMENSIONS, OFFLINE_ANSWER_MARKER,
};
pub use retrieval::Retriever;
pub use retry::{RetryClass, RetryFailure, RetryPolicy};
pub use sections::extract_sections;
pub use store::{cosine_similarity, VectorStore};
