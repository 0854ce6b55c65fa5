use crate::error::ProviderError;
use crate::providers::{ChatMessage, ModelProvider};
use async_trait::async_trait;

pub const DEFAULT_OFFLINE_DIMENSIONS: usize = 256;

pub const OFFLINE_ANSWER_MARKER: &str = "[offline demo mode]";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[derive(Debug, Clone, Copy)]
pub struct OfflineProvider {
    pub dimensions: usize,
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_OFFLINE_DIMENSIONS,
        }
    }
}

impl OfflineProvider {
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_deterministic(&self, text: &str) -> Vec<f32> {
        let mut state = fnv1a(text);
        if state == 0 {
            state = FNV_OFFSET;
        }

        let mut vector = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            state = xorshift64star(&mut state);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            vector.push((unit * 2.0 - 1.0) as f32);
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl ModelProvider for OfflineProvider {
    fn is_offline(&self) -> bool {
        true
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_deterministic(text))
    }

    async fn chat_complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|message| message.role == "user")
            .map(|message| message.content.as_str())
            .unwrap_or_default();

        let summary = summarize_context(prompt);
        Ok(format!("{OFFLINE_ANSWER_MARKER} {summary}"))
    }
}

fn fnv1a(text: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn xorshift64star(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    *state = x;
    x.wrapping_mul(0x2545_f491_4f6c_dd1d)
}

fn summarize_context(prompt: &str) -> String {
    let context = context_block(prompt);

    let mut picked = Vec::new();
    for line in context.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("[Source") || line.starts_with("---") {
            continue;
        }

        if line.starts_with('-') || line.starts_with('*') {
            picked.push(line.to_string());
        } else {
            for sentence in line.split_inclusive('.') {
                let sentence = sentence.trim();
                if !sentence.is_empty() {
                    picked.push(sentence.to_string());
                }
                if picked.len() >= 3 {
                    break;
                }
            }
        }

        if picked.len() >= 3 {
            break;
        }
    }

    if picked.is_empty() {
        "No context was available to summarize.".to_string()
    } else {
        picked.join(" ")
    }
}

fn context_block(prompt: &str) -> &str {
    let start = prompt
        .find("Context:")
        .map(|index| index + "Context:".len())
        .unwrap_or(0);
    let rest = &prompt[start..];
    match rest.find("\n\nQuestion:") {
        Some(end) => &rest[..end],
        None => rest,
    }
}
