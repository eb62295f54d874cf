//! Session state engine.
//!
//! ```text
//! +------------------------------------------+
//! |  SessionStore (Mutex<map> + dirty set)   |
//! |    autosave loop -> SessionRepository     |
//! +------------------------------------------+
//!          |                     |
//!          v                     v
//!   session.json manifests   pages/<id><ext>
//! ```
//!
//! `store` is the concurrency-safe registry, `repository` the durable layer
//! beneath it, `archive` the portable container codec on top, `model` the
//! plain data types shared by all three.

pub mod archive;
pub mod model;
pub mod repository;
pub mod store;

pub use archive::{export_session, import_session, ARCHIVE_EXTENSION};
pub use model::{
    PageMetadata, PageSource, SessionCreate, SessionDetail, SessionPage, SessionStatus,
    SessionSummary, SessionUpdate,
};
pub use repository::SessionRepository;
pub use store::SessionStore;
