use crate::error::ProviderError;
use crate::providers::{ModelProvider, OfflineProvider, OpenAiProvider, QuotaFallbackProvider};
use std::sync::Arc;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub offline_mode: bool,
    pub fallback_to_offline_on_quota: bool,
    pub embedding_model: String,
    pub chat_model: String,
    pub allow_general_knowledge: bool,
    pub api_base: String,
    pub api_key: Option<String>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            offline_mode: false,
            fallback_to_offline_on_quota: false,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            allow_general_knowledge: false,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
        }
    }
}

impl RagConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            offline_mode: env_flag("CORPUS_QA_OFFLINE").unwrap_or(defaults.offline_mode),
            fallback_to_offline_on_quota: env_flag("CORPUS_QA_FALLBACK_OFFLINE_ON_QUOTA")
                .unwrap_or(defaults.fallback_to_offline_on_quota),
            embedding_model: env_string("CORPUS_QA_EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            chat_model: env_string("CORPUS_QA_CHAT_MODEL").unwrap_or(defaults.chat_model),
            allow_general_knowledge: env_flag("CORPUS_QA_ALLOW_GENERAL_KNOWLEDGE")
                .unwrap_or(defaults.allow_general_knowledge),
            api_base: env_string("CORPUS_QA_API_BASE").unwrap_or(defaults.api_base),
            api_key: env_string("CORPUS_QA_API_KEY").or_else(|| env_string("OPENAI_API_KEY")),
        }
    }

    /// Selects the provider implementation once, at construction time.
    pub fn build_provider(&self) -> Result<Arc<dyn ModelProvider>, ProviderError> {
        if self.offline_mode {
            return Ok(Arc::new(OfflineProvider::default()));
        }

        let live = OpenAiProvider::new(self)?;
        if self.fallback_to_offline_on_quota {
            Ok(Arc::new(QuotaFallbackProvider::new(live)))
        } else {
            Ok(Arc::new(live))
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_flag(name: &str) -> Option<bool> {
    env_string(name).map(|value| {
        matches!(
            value.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}
