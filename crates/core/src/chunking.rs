use crate::models::{Chunk, ChunkMetadata, Document};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
    pub section_pass: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
            section_pass: true,
        }
    }
}

pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let size = config.size.max(1);
    let mut chunks = Vec::new();
    let mut cursor = 0usize;

    while cursor < chars.len() {
        let window_end = (cursor + size).min(chars.len());

        if window_end == chars.len() {
            push_trimmed(&mut chunks, &chars[cursor..window_end]);
            break;
        }

        let window = &chars[cursor..window_end];
        let break_at = last_position(window, '.')
            .max(last_position(window, '\n'))
            .max(last_position(window, ' '));

        let (cut, stepped_back) = match break_at {
            Some(position) if position > window.len() / 2 => {
                let break_point = cursor + position;
                (break_point + 1, break_point.saturating_sub(config.overlap))
            }
            _ => (window_end, window_end.saturating_sub(config.overlap)),
        };

        push_trimmed(&mut chunks, &chars[cursor..cut]);
        // forward progress even when overlap >= size
        cursor = stepped_back.max(cursor + 1);
    }

    chunks
}

pub fn chunk_document(
    document: &Document,
    config: &ChunkingConfig,
    source: &str,
    namespace: Option<&str>,
) -> Vec<Chunk> {
    let document_id = document_id(&document.title);
    let mut chunks = Vec::new();
    let mut index = 0usize;

    for piece in chunk_text(&document.content, config) {
        chunks.push(build_chunk(
            &document_id,
            &mut index,
            piece,
            document,
            source,
            namespace,
            None,
        ));
    }

    if config.section_pass {
        for section in &document.sections {
            for piece in chunk_text(&section.content, config) {
                let content = format!("{}\n\n{}", section.title, piece);
                chunks.push(build_chunk(
                    &document_id,
                    &mut index,
                    content,
                    document,
                    source,
                    namespace,
                    Some(section.title.clone()),
                ));
            }
        }
    }

    chunks
}

fn build_chunk(
    document_id: &str,
    index: &mut usize,
    content: String,
    document: &Document,
    source: &str,
    namespace: Option<&str>,
    section: Option<String>,
) -> Chunk {
    let chunk = Chunk {
        id: format!("{document_id}-{index}"),
        content,
        embedding: Vec::new(),
        metadata: ChunkMetadata {
            source: source.to_string(),
            title: document.title.clone(),
            url: document.url.clone(),
            section,
            namespace: namespace.map(str::to_string),
        },
    };
    *index += 1;
    chunk
}

fn last_position(window: &[char], needle: char) -> Option<usize> {
    window.iter().rposition(|c| *c == needle)
}

fn push_trimmed(chunks: &mut Vec<String>, window: &[char]) {
    let piece: String = window.iter().collect();
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn document_id(title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{chunk_document, chunk_text, ChunkingConfig};
    use crate::models::{Document, Section};

    fn config(size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            size,
            overlap,
            section_pass: true,
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("Hello world.", &config(1000, 200));
        assert_eq!(chunks, vec!["Hello world.".to_string()]);
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        assert!(chunk_text("   \n\n  ", &config(1000, 200)).is_empty());
        assert!(chunk_text("", &config(1000, 200)).is_empty());
    }

    #[test]
    fn chunks_break_at_sentence_boundaries() {
        let text = "First sentence here today.Second_sentence_follows_along_after_it_extra_tail";
        let chunks = chunk_text(text, &config(40, 10));

        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0], "First sentence here today.");
    }

    #[test]
    fn latest_boundary_in_window_wins() {
        let text = "First sentence here today. Second sentence follows along after it.";
        let chunks = chunk_text(text, &config(40, 10));

        // the last space sits past the period, so the cut lands on it
        assert_eq!(chunks[0], "First sentence here today. Second");
    }

    #[test]
    fn every_chunk_is_trimmed_and_non_empty() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa".repeat(20);
        for chunk in chunk_text(&text, &config(64, 16)) {
            assert!(!chunk.is_empty());
            assert_eq!(chunk, chunk.trim());
        }
    }

    #[test]
    fn all_words_survive_chunking() {
        let text = "the quick brown fox jumps over the lazy dog again and again today";
        let joined = chunk_text(text, &config(16, 4)).join(" ");
        for word in text.split_whitespace() {
            assert!(joined.contains(word), "missing word {word:?}");
        }
    }

    #[test]
    fn terminates_when_overlap_exceeds_size() {
        let text = "x".repeat(300);
        let chunks = chunk_text(&text, &config(10, 50));
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|chunk| !chunk.is_empty()));
    }

    #[test]
    fn document_produces_main_and_section_chunks() {
        let document = Document {
            title: "Guide".to_string(),
            content: "# Intro\nHello world. This is a test.".to_string(),
            url: None,
            sections: vec![Section {
                title: "Intro".to_string(),
                content: "Hello world. This is a test.".to_string(),
                level: 1,
            }],
        };

        let chunks = chunk_document(&document, &ChunkingConfig::default(), "uploaded", None);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].metadata.section.is_none());
        assert!(chunks[0].content.contains("Hello world. This is a test."));
        assert_eq!(chunks[1].metadata.section.as_deref(), Some("Intro"));
        assert!(chunks[1].content.starts_with("Intro\n\n"));
        assert!(chunks[1].content.contains("Hello world. This is a test."));
    }

    #[test]
    fn chunk_ids_are_sequential_within_a_document() {
        let document = Document {
            title: "Guide".to_string(),
            content: "body text".to_string(),
            url: None,
            sections: vec![Section {
                title: "A".to_string(),
                content: "section text".to_string(),
                level: 1,
            }],
        };

        let chunks = chunk_document(&document, &ChunkingConfig::default(), "uploaded", None);
        let ids: Vec<&str> = chunks.iter().map(|chunk| chunk.id.as_str()).collect();

        assert_eq!(chunks.len(), 2);
        assert!(ids[0].ends_with("-0"));
        assert!(ids[1].ends_with("-1"));
        assert_eq!(ids.len(), {
            let mut unique = ids.clone();
            unique.dedup();
            unique.len()
        });
    }

    #[test]
    fn section_pass_can_be_disabled() {
        let document = Document {
            title: "Guide".to_string(),
            content: "# Intro\nbody".to_string(),
            url: None,
            sections: vec![Section {
                title: "Intro".to_string(),
                content: "body".to_string(),
                level: 1,
            }],
        };

        let config = ChunkingConfig {
            section_pass: false,
            ..ChunkingConfig::default()
        };
        let chunks = chunk_document(&document, &config, "uploaded", None);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].metadata.section.is_none());
    }

    #[test]
    fn namespace_and_source_are_tagged() {
        let document = Document {
            title: "Guide".to_string(),
            content: "body".to_string(),
            url: Some("https://example.com/guide".to_string()),
            sections: Vec::new(),
        };

        let chunks = chunk_document(&document, &ChunkingConfig::default(), "uploaded", Some("acme"));

        assert_eq!(chunks[0].metadata.source, "uploaded");
        assert_eq!(chunks[0].metadata.namespace.as_deref(), Some("acme"));
        assert_eq!(
            chunks[0].metadata.url.as_deref(),
            Some("https://example.com/guide")
        );
    }
}
