use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    PlainText,
    Markdown,
    Pdf,
    Docx,
    Audio,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "md" | "markdown" => Self::Markdown,
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "mp3" | "wav" | "m4a" | "ogg" => Self::Audio,
            _ => Self::PlainText,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub trace: Option<String>,
}

/// Boundary for pluggable document extraction. Extraction is best effort:
/// implementations return empty text rather than failing outright.
pub trait TextExtractor {
    fn extract(&self, bytes: &[u8], kind: SourceKind) -> ExtractedText;
}

#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8], kind: SourceKind) -> ExtractedText {
        match kind {
            SourceKind::PlainText | SourceKind::Markdown => ExtractedText {
                text: String::from_utf8_lossy(bytes).into_owned(),
                trace: None,
            },
            other => ExtractedText {
                text: String::new(),
                trace: Some(format!("no extractor wired for {other:?} input")),
            },
        }
    }
}
