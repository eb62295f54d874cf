//! Markdown renderer.

use crate::document::{BlockType, Document, DocumentPage};
use crate::error::Result;

use super::{DocumentExporter, ExportFormat, ExportRequest, ExportResult};

pub struct MarkdownExporter;

impl MarkdownExporter {
    fn render_page(lines: &mut Vec<String>, page: &DocumentPage) {
        lines.push(format!("## Page {}", page.index + 1));
        for block in &page.blocks {
            let text = block
                .spans
                .iter()
                .map(|span| span.text.as_str())
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string();
            if text.is_empty() {
                continue;
            }
            if block.block_type == BlockType::Header {
                lines.push(format!("**{}**", text));
            } else {
                lines.push(text);
            }
            lines.push(String::new());
        }
    }
}

impl DocumentExporter for MarkdownExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Markdown
    }

    fn export(&self, document: &Document, request: &ExportRequest) -> Result<ExportResult> {
        let mut lines = vec!["# Recognized document".to_string(), String::new()];
        for page in &document.pages {
            Self::render_page(&mut lines, page);
        }
        Ok(ExportResult {
            filename: format!("{}.md", request.filename_hint),
            media_type: "text/markdown; charset=utf-8".to_string(),
            content: lines.join("\n").into_bytes(),
        })
    }
}
