//! Task orchestration and progress event streaming.
//!
//! ```text
//! start_task ----> tokio task ----> EventBroker ----> subscribers
//!                     |                                (SSE stream)
//!                     +-- task-started / -completed / -failed / -cancelled
//! ```
//!
//! `broker` owns the per-session subscriber sets, `manager` runs the
//! background work and bridges its lifecycle into events, `events` defines
//! the wire-level message vocabulary.

pub mod broker;
pub mod events;
pub mod manager;

pub use broker::{EventBroker, Subscription};
pub use events::ProgressEvent;
pub use manager::{TaskManager, TaskMeta};
