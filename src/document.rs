//! Recognized document value types.
//!
//! A `Document` is produced by one recognition run and treated as immutable
//! once attached to a session. Pages hold blocks, blocks hold text spans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Piece of recognized text with positional information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextSpan {
    pub text: String,
    #[serde(default)]
    pub confidence: f32,
    /// x, y, w, h
    #[serde(default)]
    pub bbox: [u32; 4],
}

/// Kind of layout block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    #[default]
    Paragraph,
    Header,
    Footer,
    Table,
    Figure,
}

/// Block of text such as a paragraph, header, or table cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentBlock {
    pub id: String,
    #[serde(default, rename = "type")]
    pub block_type: BlockType,
    #[serde(default)]
    pub bbox: [u32; 4],
    #[serde(default)]
    pub spans: Vec<TextSpan>,
}

/// Single recognized page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentPage {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub blocks: Vec<DocumentBlock>,
}

/// Full recognized document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_language_hint")]
    pub language_hint: String,
    #[serde(default)]
    pub pages: Vec<DocumentPage>,
}

fn default_language_hint() -> String {
    "rus+eng".to_string()
}

impl Document {
    /// Assemble a document from recognized pages, stamped now.
    pub fn from_pages(pages: Vec<DocumentPage>) -> Self {
        Self {
            created_at: Utc::now(),
            language_hint: default_language_hint(),
            pages,
        }
    }
}
