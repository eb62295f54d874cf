//! Reflow backend: session-based scanned-document management with an
//! asynchronous recognition pipeline and live progress streaming.
//!
//! The session engine (`session`) owns all state: a concurrency-safe
//! registry over durable per-session directories, with dirty-tracking
//! autosave and a portable archive format. The orchestration layer (`tasks`)
//! runs background work and fans progress events out to subscribers; the
//! recognition pipeline (`pipeline`) and the export renderers (`exporters`)
//! sit behind narrow trait seams. `server` exposes it all over HTTP + SSE.

pub mod document;
pub mod error;
pub mod exporters;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod settings;
pub mod tasks;

pub use error::{ReflowError, Result};
