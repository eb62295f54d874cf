//! Plain-text renderer: span text only, pages separated by form feeds.

use crate::document::Document;
use crate::error::Result;

use super::{DocumentExporter, ExportFormat, ExportRequest, ExportResult};

pub struct PlainTextExporter;

impl DocumentExporter for PlainTextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn export(&self, document: &Document, request: &ExportRequest) -> Result<ExportResult> {
        let pages: Vec<String> = document
            .pages
            .iter()
            .map(|page| {
                page.blocks
                    .iter()
                    .flat_map(|block| block.spans.iter())
                    .map(|span| span.text.as_str())
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect();
        Ok(ExportResult {
            filename: format!("{}.txt", request.filename_hint),
            media_type: "text/plain; charset=utf-8".to_string(),
            content: pages.join("\n\x0c\n").into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_document;
    use super::*;

    #[test]
    fn concatenates_span_text() {
        let request = ExportRequest {
            format: ExportFormat::Text,
            filename_hint: "doc".to_string(),
        };
        let result = PlainTextExporter
            .export(&sample_document(), &request)
            .unwrap();
        let text = String::from_utf8(result.content).unwrap();
        assert_eq!(text, "Quarterly Report\nRevenue grew modestly.");
        assert_eq!(result.filename, "doc.txt");
    }
}
