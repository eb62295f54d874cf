//! Recognition pipeline: session pages in, structured document out.
//!
//! For each page in index order the orchestrator loads the stored bytes,
//! preprocesses the bitmap, detects layout blocks, recognizes each block, and
//! assembles a document page — publishing progress through the task layer the
//! whole way. The image/layout/recognition steps are pure collaborators
//! behind traits; the orchestrator only sequences them.

pub mod layout;
pub mod ocr;
pub mod preprocess;

use std::sync::Arc;

use uuid::Uuid;

use crate::document::{Document, DocumentPage};
use crate::error::{ReflowError, Result};
use crate::session::SessionStore;
use crate::tasks::{ProgressEvent, TaskManager};

pub use layout::{LayoutAnalyzer, LayoutRegion, SimpleLayoutAnalyzer};
pub use ocr::{CompositeEngine, FallbackEngine, OcrEngine};
pub use preprocess::{ImagePreprocessor, Preprocessor};

pub struct RecognitionPipeline {
    preprocessor: Arc<dyn Preprocessor>,
    layout: Arc<dyn LayoutAnalyzer>,
    ocr: Arc<CompositeEngine>,
}

impl Default for RecognitionPipeline {
    fn default() -> Self {
        Self {
            preprocessor: Arc::new(ImagePreprocessor::default()),
            layout: Arc::new(SimpleLayoutAnalyzer::default()),
            ocr: Arc::new(CompositeEngine::default()),
        }
    }
}

impl RecognitionPipeline {
    pub fn new(
        preprocessor: Arc<dyn Preprocessor>,
        layout: Arc<dyn LayoutAnalyzer>,
        ocr: Arc<CompositeEngine>,
    ) -> Self {
        Self {
            preprocessor,
            layout,
            ocr,
        }
    }

    /// Run one recognition pass over every page of the session, attach the
    /// resulting document, and return it.
    ///
    /// Progress events go out through `manager`'s publish path; per-page CPU
    /// work runs on blocking worker threads so the caller's executor stays
    /// responsive. A session with zero pages is rejected up front.
    pub async fn run(
        &self,
        session_id: Uuid,
        store: &SessionStore,
        manager: &TaskManager,
    ) -> Result<Document> {
        let session = store.get(session_id)?;
        if session.pages.is_empty() {
            return Err(ReflowError::EmptySession(session_id));
        }

        manager.publish(
            session_id,
            &ProgressEvent::RecognitionStart {
                session_id,
                total_pages: session.pages.len(),
            },
        );

        let mut doc_pages = Vec::with_capacity(session.pages.len());
        for (index, page) in session.pages.iter().enumerate() {
            manager.publish(session_id, &ProgressEvent::PageStart { page_index: index });

            let path = store.page_path(session_id, page.id)?;
            let bytes = tokio::fs::read(&path).await?;
            let doc_page = self.process_page(index, bytes).await?;
            doc_pages.push(doc_page);

            manager.publish(
                session_id,
                &ProgressEvent::PageComplete { page_index: index },
            );
        }

        let document = Document::from_pages(doc_pages);
        manager.publish(
            session_id,
            &ProgressEvent::RecognitionFinished {
                pages: document.pages.len(),
            },
        );
        store.save_document(session_id, document.clone())?;
        Ok(document)
    }

    async fn process_page(&self, index: usize, bytes: Vec<u8>) -> Result<DocumentPage> {
        let preprocessor = self.preprocessor.clone();
        let layout = self.layout.clone();
        let ocr = self.ocr.clone();

        tokio::task::spawn_blocking(move || -> Result<DocumentPage> {
            let decoded = image::load_from_memory(&bytes).map_err(|err| {
                ReflowError::Recognition(format!("unable to decode image for page {index}: {err}"))
            })?;
            let processed = preprocessor.process(decoded.to_luma8());
            let regions = layout.analyze(&processed);
            let blocks = regions
                .iter()
                .map(|region| ocr.recognize(&processed, region))
                .collect();
            Ok(DocumentPage {
                index,
                width: processed.width(),
                height: processed.height(),
                blocks,
            })
        })
        .await
        .map_err(|err| ReflowError::Recognition(format!("page {index} worker panicked: {err}")))?
    }
}
