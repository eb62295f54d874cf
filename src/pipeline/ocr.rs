//! Text-recognition engine abstractions.
//!
//! Engines are pure `(image, region) -> block` functions. The composite
//! engine tries each configured backend in order and degrades to a
//! placeholder block instead of failing a whole page, so a misconfigured
//! backend shows up in the output rather than aborting the run.

use image::GrayImage;

use crate::document::{DocumentBlock, TextSpan};
use crate::error::{ReflowError, Result};

use super::layout::LayoutRegion;

pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &GrayImage, region: &LayoutRegion) -> Result<DocumentBlock>;
}

/// Produces placeholder blocks when no real recognition backend is wired in.
#[derive(Default)]
pub struct FallbackEngine;

impl OcrEngine for FallbackEngine {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn recognize(&self, _image: &GrayImage, region: &LayoutRegion) -> Result<DocumentBlock> {
        let span = TextSpan {
            text: "Recognition engine unavailable. Configure an OCR backend to enable text output."
                .to_string(),
            confidence: 0.0,
            bbox: region.bbox,
        };
        Ok(DocumentBlock {
            id: region.id.clone(),
            block_type: region.kind,
            bbox: region.bbox,
            spans: vec![span],
        })
    }
}

/// Tries each engine in order; the first success wins. When every engine
/// fails the block carries the last error as a zero-confidence span.
pub struct CompositeEngine {
    engines: Vec<Box<dyn OcrEngine>>,
}

impl Default for CompositeEngine {
    fn default() -> Self {
        Self {
            engines: vec![Box::new(FallbackEngine)],
        }
    }
}

impl CompositeEngine {
    pub fn with_engines(mut engines: Vec<Box<dyn OcrEngine>>) -> Self {
        engines.push(Box::new(FallbackEngine));
        Self { engines }
    }

    pub fn recognize(&self, image: &GrayImage, region: &LayoutRegion) -> DocumentBlock {
        let mut last_error: Option<ReflowError> = None;
        for engine in &self.engines {
            match engine.recognize(image, region) {
                Ok(block) => return block,
                Err(err) => {
                    tracing::debug!("OCR engine {} failed: {}", engine.name(), err);
                    last_error = Some(err);
                }
            }
        }
        let message = match last_error {
            Some(err) => format!("OCR failed: {}", err),
            None => "OCR failed: no engines configured".to_string(),
        };
        DocumentBlock {
            id: region.id.clone(),
            block_type: region.kind,
            bbox: region.bbox,
            spans: vec![TextSpan {
                text: message,
                confidence: 0.0,
                bbox: region.bbox,
            }],
        }
    }
}
