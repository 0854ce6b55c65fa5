use crate::config::RagConfig;
use crate::error::ProviderError;
use crate::providers::{classify_provider_error, flatten_retry, ChatMessage, ModelProvider};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub struct OpenAiProvider {
    client: Client,
    api_base: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiProvider {
    pub fn new(config: &RagConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::MissingCredentials(
                "set CORPUS_QA_API_KEY (or OPENAI_API_KEY) or enable offline mode".to_string(),
            )
        })?;

        Ok(Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }

        let retry_after = parse_retry_after(response.headers());
        let body_text = response.text().await.unwrap_or_default();

        if is_quota_failure(status.as_u16(), &body_text) {
            return Err(ProviderError::Quota {
                status: status.as_u16(),
                detail: body_text,
            });
        }

        Err(ProviderError::Status {
            status: status.as_u16(),
            body: body_text,
            retry_after,
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn is_offline(&self) -> bool {
        false
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        debug!(model = %self.embedding_model, chars = text.len(), "embedding text");

        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let value = self
            .retry
            .run(classify_provider_error, || {
                self.post_json("/v1/embeddings", &body)
            })
            .await
            .map_err(flatten_retry)?;

        let parsed: EmbeddingResponse = serde_json::from_value(value)?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                ProviderError::UnexpectedResponse("embedding response had no data".to_string())
            })
    }

    async fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        debug!(model = %self.chat_model, messages = messages.len(), "requesting completion");

        let body = json!({
            "model": self.chat_model,
            "messages": messages,
        });

        let value = self
            .retry
            .run(classify_provider_error, || {
                self.post_json("/v1/chat/completions", &body)
            })
            .await
            .map_err(flatten_retry)?;

        let parsed: ChatResponse = serde_json::from_value(value)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::UnexpectedResponse("completion response had no choices".to_string())
            })
    }
}

fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn is_quota_failure(status: u16, body: &str) -> bool {
    if status == 402 || status == 403 {
        return true;
    }
    let lowered = body.to_lowercase();
    lowered.contains("insufficient_quota") || lowered.contains("billing")
}

#[cfg(test)]
mod tests {
    use super::{is_quota_failure, parse_retry_after};
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
    use std::time::Duration;

    #[test]
    fn quota_failures_are_recognized() {
        assert!(is_quota_failure(402, ""));
        assert!(is_quota_failure(403, ""));
        assert!(is_quota_failure(
            429,
            r#"{"error":{"code":"insufficient_quota"}}"#
        ));
        assert!(is_quota_failure(400, "Billing hard limit reached"));
        assert!(!is_quota_failure(429, "rate limited"));
        assert!(!is_quota_failure(500, "server error"));
    }

    #[test]
    fn retry_after_header_parses_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        let mut date_form = HeaderMap::new();
        date_form.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2025 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&date_form), None);

        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }
}
