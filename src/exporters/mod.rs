//! Document exporters: `(document, format) -> (filename, media type, bytes)`.
//!
//! Renderers are pure functions behind the `DocumentExporter` trait; the
//! registry resolves a requested format to its renderer.

pub mod json;
pub mod markdown;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{ReflowError, Result};

pub use json::JsonExporter;
pub use markdown::MarkdownExporter;
pub use text::PlainTextExporter;

/// Output format of a document export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Text,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Parameters of one export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub format: ExportFormat,
    /// Sanitized stem for the produced filename
    pub filename_hint: String,
}

/// A rendered document ready for download.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub filename: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

pub trait DocumentExporter: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn export(&self, document: &Document, request: &ExportRequest) -> Result<ExportResult>;
}

/// Resolves exporters by format.
pub struct ExporterRegistry {
    exporters: Vec<Box<dyn DocumentExporter>>,
}

impl Default for ExporterRegistry {
    fn default() -> Self {
        Self {
            exporters: vec![
                Box::new(MarkdownExporter),
                Box::new(PlainTextExporter),
                Box::new(JsonExporter),
            ],
        }
    }
}

impl ExporterRegistry {
    pub fn export(&self, document: &Document, request: &ExportRequest) -> Result<ExportResult> {
        let exporter = self
            .exporters
            .iter()
            .find(|exporter| exporter.format() == request.format)
            .ok_or_else(|| ReflowError::UnsupportedFormat(request.format.as_str().to_string()))?;
        exporter.export(document, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockType, DocumentBlock, DocumentPage, TextSpan};

    pub(crate) fn sample_document() -> Document {
        Document::from_pages(vec![DocumentPage {
            index: 0,
            width: 100,
            height: 100,
            blocks: vec![
                DocumentBlock {
                    id: "h".to_string(),
                    block_type: BlockType::Header,
                    bbox: [0, 0, 100, 10],
                    spans: vec![TextSpan {
                        text: "Quarterly Report".to_string(),
                        confidence: 0.95,
                        bbox: [0, 0, 100, 10],
                    }],
                },
                DocumentBlock {
                    id: "p".to_string(),
                    block_type: BlockType::Paragraph,
                    bbox: [0, 20, 100, 40],
                    spans: vec![TextSpan {
                        text: "Revenue grew modestly.".to_string(),
                        confidence: 0.88,
                        bbox: [0, 20, 100, 10],
                    }],
                },
            ],
        }])
    }

    #[test]
    fn registry_resolves_every_format() {
        let registry = ExporterRegistry::default();
        let document = sample_document();
        for format in [ExportFormat::Markdown, ExportFormat::Text, ExportFormat::Json] {
            let request = ExportRequest {
                format,
                filename_hint: "doc".to_string(),
            };
            let result = registry.export(&document, &request).unwrap();
            assert!(!result.content.is_empty());
            assert!(result.filename.starts_with("doc."));
        }
    }

    #[test]
    fn format_parses_from_lowercase() {
        let format: ExportFormat = serde_json::from_str("\"markdown\"").unwrap();
        assert_eq!(format, ExportFormat::Markdown);
    }
}
