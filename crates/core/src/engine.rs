use crate::config::RagConfig;
use crate::error::RetrievalError;
use crate::models::{AnswerOutcome, ChunkPreview, RetrievalConfig};
use crate::providers::{ChatMessage, ModelProvider};
use crate::retrieval::Retriever;
use crate::store::{matches_namespace, VectorStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub const EMPTY_STORE_ANSWER: &str =
    "The knowledge base is empty. Ingest documents before asking questions.";

const PREVIEW_CHARS: usize = 120;

pub struct AnswerEngine {
    store: Arc<VectorStore>,
    provider: Arc<dyn ModelProvider>,
    retriever: Retriever,
    allow_general_knowledge: bool,
}

impl AnswerEngine {
    pub fn new(
        store: Arc<VectorStore>,
        provider: Arc<dyn ModelProvider>,
        config: &RagConfig,
    ) -> Self {
        let retriever = Retriever::new(store.clone(), provider.clone(), RetrievalConfig::default());
        Self {
            store,
            provider,
            retriever,
            allow_general_knowledge: config.allow_general_knowledge,
        }
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retriever = Retriever::new(self.store.clone(), self.provider.clone(), retrieval);
        self
    }

    pub async fn answer(
        &self,
        question: &str,
        namespace: Option<&str>,
    ) -> Result<AnswerOutcome, RetrievalError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RetrievalError::EmptyQuestion);
        }
        let namespace = namespace.map(str::trim).filter(|ns| !ns.is_empty());

        let started = Instant::now();
        let retrieved = self.retriever.retrieve(question, namespace).await?;

        if retrieved.chunks.is_empty() {
            return Ok(AnswerOutcome {
                answer: EMPTY_STORE_ANSWER.to_string(),
                sources: Vec::new(),
                retrieved_chunk_count: 0,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let messages = build_messages(
            question,
            &retrieved.context,
            &retrieved.domain_label,
            self.allow_general_knowledge,
        );
        let answer = self.provider.chat_complete(&messages).await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            chunks = retrieved.chunks.len(),
            sources = retrieved.sources.len(),
            elapsed_ms,
            "answered question"
        );

        Ok(AnswerOutcome {
            answer,
            sources: retrieved.sources,
            retrieved_chunk_count: retrieved.chunks.len(),
            elapsed_ms,
        })
    }

    pub fn count(&self, namespace: Option<&str>) -> usize {
        self.store.count_namespace(namespace)
    }

    pub fn preview(&self, namespace: Option<&str>, limit: usize) -> Vec<ChunkPreview> {
        self.store
            .get_all()
            .iter()
            .filter(|chunk| matches_namespace(chunk, namespace))
            .take(limit)
            .map(|chunk| ChunkPreview {
                id: chunk.id.clone(),
                title: chunk.metadata.title.clone(),
                source: chunk.metadata.source.clone(),
                content_preview: truncate_chars(&chunk.content, PREVIEW_CHARS),
            })
            .collect()
    }
}

fn build_messages(
    question: &str,
    context: &str,
    domain_label: &str,
    allow_general_knowledge: bool,
) -> Vec<ChatMessage> {
    let mut system = format!(
        "You are an assistant answering questions strictly from {domain_label}. \
         Base every statement on the provided context and cite the numbered sources. \
         If the context does not contain the answer, say so plainly; never contradict the context."
    );
    if allow_general_knowledge {
        system.push_str(
            " You may add a clearly labeled \"General knowledge\" section for relevant \
             background that is not in the context.",
        );
    }

    vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("Context:\n{context}\n\nQuestion: {question}")),
    ]
}

fn truncate_chars(text: &str, limit: usize) -> String {
    let mut preview: String = text.chars().take(limit).collect();
    if preview.len() < text.len() {
        preview.push('…');
    }
    preview
}
