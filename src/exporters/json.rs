//! JSON renderer: the document structure itself, pretty-printed.

use crate::document::Document;
use crate::error::Result;

use super::{DocumentExporter, ExportFormat, ExportRequest, ExportResult};

pub struct JsonExporter;

impl DocumentExporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn export(&self, document: &Document, request: &ExportRequest) -> Result<ExportResult> {
        let content = serde_json::to_vec_pretty(document)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        Ok(ExportResult {
            filename: format!("{}.json", request.filename_hint),
            media_type: "application/json".to_string(),
            content,
        })
    }
}
