pub mod offline;
pub mod openai;

pub use offline::{OfflineProvider, DEFAULT_OFFLINE_DIMENSIONS, OFFLINE_ANSWER_MARKER};
pub use openai::OpenAiProvider;

use crate::error::ProviderError;
use crate::retry::{RetryClass, RetryFailure};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn is_offline(&self) -> bool;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    async fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError>;
}

pub fn classify_provider_error(error: &ProviderError) -> RetryClass {
    match error {
        ProviderError::Http(_) => RetryClass::Transient { retry_after: None },
        ProviderError::Status {
            status,
            retry_after,
            ..
        } if *status == 429 || *status >= 500 => RetryClass::Transient {
            retry_after: *retry_after,
        },
        _ => RetryClass::Fatal,
    }
}

pub(crate) fn flatten_retry(failure: RetryFailure<ProviderError>) -> ProviderError {
    if failure.exhausted {
        ProviderError::RetriesExhausted {
            attempts: failure.attempts,
            last: failure.error.to_string(),
        }
    } else {
        failure.error
    }
}

/// Wraps a live provider and downgrades to the offline provider for the rest
/// of the process once a billing/quota failure is observed.
pub struct QuotaFallbackProvider<P> {
    primary: P,
    offline: OfflineProvider,
    downgraded: AtomicBool,
}

impl<P: ModelProvider> QuotaFallbackProvider<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            offline: OfflineProvider::default(),
            downgraded: AtomicBool::new(false),
        }
    }

    fn note_downgrade(&self, operation: &str, error: &ProviderError) {
        warn!(operation, "provider quota failure, downgrading to offline mode: {error}");
        self.downgraded.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl<P: ModelProvider> ModelProvider for QuotaFallbackProvider<P> {
    fn is_offline(&self) -> bool {
        self.primary.is_offline() || self.downgraded.load(Ordering::Relaxed)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        if self.downgraded.load(Ordering::Relaxed) {
            return self.offline.embed(text).await;
        }

        match self.primary.embed(text).await {
            Err(error @ ProviderError::Quota { .. }) => {
                self.note_downgrade("embed", &error);
                self.offline.embed(text).await
            }
            other => other,
        }
    }

    async fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        if self.downgraded.load(Ordering::Relaxed) {
            return self.offline.chat_complete(messages).await;
        }

        match self.primary.chat_complete(messages).await {
            Err(error @ ProviderError::Quota { .. }) => {
                self.note_downgrade("chat_complete", &error);
                self.offline.chat_complete(messages).await
            }
            other => other,
        }
    }
}
