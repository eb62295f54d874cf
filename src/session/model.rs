//! Session and page data model.
//!
//! `SessionDetail` is the aggregate root: an ordered page sequence, an
//! optional recognized document, and a lifecycle status. Mutations go through
//! the store, which always returns a fresh immutable snapshot; these types are
//! plain data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Document;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Draft,
    Processing,
    Ready,
    Error,
}

/// How a page entered the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    /// Uploaded by the user
    #[default]
    File,
    /// Copied in programmatically (archive import)
    Import,
}

/// Image properties probed at upload time. All fields optional: a page whose
/// bytes cannot be decoded still gets a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

impl PageMetadata {
    /// Probe image dimensions from raw bytes. Decode failures degrade to a
    /// mimetype-only record; an upload never fails because of them.
    pub fn probe(data: &[u8], mimetype: Option<&str>) -> Self {
        match image::load_from_memory(data) {
            Ok(img) => Self {
                width: Some(img.width()),
                height: Some(img.height()),
                dpi: None,
                mimetype: mimetype.map(str::to_string),
            },
            Err(_) => Self {
                mimetype: mimetype.map(str::to_string),
                ..Default::default()
            },
        }
    }
}

/// One scanned page. The image bytes live on disk under the owning session's
/// directory; this record is metadata only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionPage {
    pub id: Uuid,
    /// Position in the session's page sequence, always `0..n-1`
    pub index: usize,
    /// Stored filename, `{id}{ext}`
    pub filename: String,
    pub original_name: String,
    pub source: PageSource,
    pub metadata: PageMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full session aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionDetail {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub page_count: usize,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_recognized_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    pub pages: Vec<SessionPage>,
}

impl SessionDetail {
    /// Re-derive contiguous page indices after any structural page mutation
    /// and refresh the touched timestamps.
    pub fn reindex_pages(&mut self, now: DateTime<Utc>) {
        for (idx, page) in self.pages.iter_mut().enumerate() {
            if page.index != idx {
                page.index = idx;
                page.updated_at = now;
            }
        }
        self.page_count = self.pages.len();
        self.updated_at = now;
    }

    /// Find a page by id.
    pub fn page(&self, page_id: Uuid) -> Option<&SessionPage> {
        self.pages.iter().find(|p| p.id == page_id)
    }
}

/// List view of a session, without pages or document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub page_count: usize,
    pub status: SessionStatus,
}

impl From<&SessionDetail> for SessionSummary {
    fn from(session: &SessionDetail) -> Self {
        Self {
            id: session.id,
            name: session.name.clone(),
            description: session.description.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            page_count: session.page_count,
            status: session.status,
        }
    }
}

/// Payload for creating a session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionCreate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; only present fields are applied.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Resolve the stored-file extension for a page: lowercased suffix of the
/// original name when present, else inferred from the MIME type.
pub fn resolve_extension(original_name: &str, mimetype: Option<&str>) -> String {
    if let Some((_, suffix)) = original_name.rsplit_once('.') {
        if !suffix.is_empty() {
            return format!(".{}", suffix.to_lowercase());
        }
    }
    match mimetype {
        Some("image/jpeg") => ".jpg".to_string(),
        Some("image/png") => ".png".to_string(),
        _ => ".bin".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(index: usize) -> SessionPage {
        let now = Utc::now();
        SessionPage {
            id: Uuid::new_v4(),
            index,
            filename: format!("{}.png", Uuid::new_v4()),
            original_name: "scan.png".to_string(),
            source: PageSource::File,
            metadata: PageMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    mod extension_tests {
        use super::super::resolve_extension;

        #[test]
        fn uses_original_suffix() {
            assert_eq!(resolve_extension("Scan.PNG", None), ".png");
            assert_eq!(resolve_extension("photo.jpeg", Some("image/png")), ".jpeg");
        }

        #[test]
        fn falls_back_to_mimetype() {
            assert_eq!(resolve_extension("page", Some("image/jpeg")), ".jpg");
            assert_eq!(resolve_extension("page", Some("image/png")), ".png");
        }

        #[test]
        fn unknown_becomes_bin() {
            assert_eq!(resolve_extension("page", Some("application/pdf")), ".bin");
            assert_eq!(resolve_extension("page", None), ".bin");
        }

        #[test]
        fn trailing_dot_is_not_an_extension() {
            assert_eq!(resolve_extension("page.", Some("image/png")), ".png");
        }
    }

    mod reindex_tests {
        use super::*;

        #[test]
        fn reindex_restores_contiguity() {
            let now = Utc::now();
            let mut session = SessionDetail {
                id: Uuid::new_v4(),
                name: "s".to_string(),
                description: None,
                created_at: now,
                updated_at: now,
                page_count: 0,
                status: SessionStatus::Draft,
                last_error: None,
                last_recognized_at: None,
                document: None,
                pages: vec![page(3), page(0), page(7)],
            };
            session.reindex_pages(Utc::now());
            let indices: Vec<usize> = session.pages.iter().map(|p| p.index).collect();
            assert_eq!(indices, vec![0, 1, 2]);
            assert_eq!(session.page_count, 3);
        }
    }

    mod metadata_tests {
        use super::*;

        #[test]
        fn probe_tolerates_garbage() {
            let meta = PageMetadata::probe(b"not an image", Some("image/png"));
            assert_eq!(meta.width, None);
            assert_eq!(meta.mimetype.as_deref(), Some("image/png"));
        }

        #[test]
        fn probe_reads_dimensions() {
            let mut buf = std::io::Cursor::new(Vec::new());
            image::GrayImage::from_pixel(32, 16, image::Luma([255]))
                .write_to(&mut buf, image::ImageFormat::Png)
                .unwrap();
            let meta = PageMetadata::probe(buf.get_ref(), Some("image/png"));
            assert_eq!(meta.width, Some(32));
            assert_eq!(meta.height, Some(16));
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Processing).unwrap(),
            "\"processing\""
        );
    }
}
