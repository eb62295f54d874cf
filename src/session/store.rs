//! In-memory session registry with dirty-tracking autosave.
//!
//! The store is the single source of truth while the process is alive. All
//! map access goes through one exclusive lock; durable I/O (manifest writes,
//! page-byte writes) happens outside the critical section so storage latency
//! never blocks unrelated callers. A background loop flushes dirty sessions
//! on a fixed interval; `shutdown` stops the loop and performs a final flush
//! so no acknowledged mutation is lost on clean shutdown.
//!
//! Every mutating operation returns a fresh immutable snapshot — callers
//! never hold a reference into the map.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::document::Document;
use crate::error::{ReflowError, Result};
use crate::settings::ReflowSettings;

use super::model::{
    resolve_extension, PageMetadata, PageSource, SessionCreate, SessionDetail, SessionPage,
    SessionStatus, SessionSummary, SessionUpdate,
};
use super::repository::SessionRepository;

struct Inner {
    sessions: HashMap<Uuid, SessionDetail>,
    dirty: HashSet<Uuid>,
}

pub struct SessionStore {
    repository: SessionRepository,
    inner: Mutex<Inner>,
    autosave_cancel: CancellationToken,
    autosave_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SessionStore {
    /// Build the store: hydrate every persisted session and start the
    /// autosave loop. Must run inside a tokio runtime. The caller owns the
    /// returned handle and is responsible for calling [`SessionStore::shutdown`]
    /// before the process exits.
    pub fn new(settings: &ReflowSettings) -> Result<Arc<Self>> {
        let repository = SessionRepository::new(&settings.data_dir)?;
        let sessions: HashMap<Uuid, SessionDetail> = repository
            .load_all()?
            .into_iter()
            .map(|session| (session.id, session))
            .collect();
        tracing::info!("Loaded {} session(s) from {}", sessions.len(), settings.data_dir.display());

        let store = Arc::new(Self {
            repository,
            inner: Mutex::new(Inner {
                sessions,
                dirty: HashSet::new(),
            }),
            autosave_cancel: CancellationToken::new(),
            autosave_handle: Mutex::new(None),
        });

        let loop_store = store.clone();
        let cancel = store.autosave_cancel.clone();
        let period = settings.autosave_interval();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await; // first tick is immediate
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(err) = loop_store.flush() {
                            tracing::error!("Autosave flush failed: {}", err);
                        }
                    }
                    _ = cancel.cancelled() => {
                        tracing::debug!("Autosave loop shutting down");
                        break;
                    }
                }
            }
        });
        *store.autosave_handle.lock() = Some(handle);

        Ok(store)
    }

    /// Persist every dirty session's current snapshot and clear its flag.
    /// Snapshots are collected under the lock; writes happen outside it. A
    /// session whose write fails stays dirty for the next tick.
    pub fn flush(&self) -> Result<()> {
        let to_save: Vec<SessionDetail> = {
            let mut inner = self.inner.lock();
            let ids: Vec<Uuid> = inner.dirty.drain().collect();
            ids.iter()
                .filter_map(|id| inner.sessions.get(id).cloned())
                .collect()
        };

        let mut first_error = None;
        for session in to_save {
            if let Err(err) = self.repository.save(&session) {
                tracing::error!("Failed to persist session {}: {}", session.id, err);
                self.inner.lock().dirty.insert(session.id);
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Stop the autosave loop and run one final flush. Idempotent.
    pub async fn shutdown(&self) {
        self.autosave_cancel.cancel();
        let handle = self.autosave_handle.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!("Autosave loop join failed: {}", err);
            }
        }
        if let Err(err) = self.flush() {
            tracing::error!("Final flush on shutdown failed: {}", err);
        }
    }

    // ------------------------------------------------------------------ CRUD

    /// All sessions, newest first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let inner = self.inner.lock();
        let mut summaries: Vec<SessionSummary> =
            inner.sessions.values().map(SessionSummary::from).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Current snapshot of one session.
    pub fn get(&self, session_id: Uuid) -> Result<SessionDetail> {
        self.inner
            .lock()
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or(ReflowError::SessionNotFound(session_id))
    }

    /// Create a new draft session.
    pub fn create(&self, payload: SessionCreate) -> SessionDetail {
        let now = Utc::now();
        let session = SessionDetail {
            id: Uuid::new_v4(),
            name: payload
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("Session {}", now.format("%Y-%m-%d %H:%M:%S"))),
            description: payload.description,
            created_at: now,
            updated_at: now,
            page_count: 0,
            status: SessionStatus::Draft,
            last_error: None,
            last_recognized_at: None,
            document: None,
            pages: vec![],
        };
        let mut inner = self.inner.lock();
        inner.sessions.insert(session.id, session.clone());
        inner.dirty.insert(session.id);
        session
    }

    /// Apply the fields present in the patch.
    pub fn update(&self, session_id: Uuid, payload: SessionUpdate) -> Result<SessionDetail> {
        self.mutate(session_id, |session| {
            if let Some(name) = payload.name {
                if !name.is_empty() {
                    session.name = name;
                }
            }
            if let Some(description) = payload.description {
                session.description = Some(description);
            }
        })
    }

    /// Remove a session from the registry and from durable storage.
    /// Idempotent: deleting an unknown id is a no-op.
    pub fn delete(&self, session_id: Uuid) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            inner.sessions.remove(&session_id);
            inner.dirty.remove(&session_id);
        }
        self.repository.delete(session_id)
    }

    // ------------------------------------------------------------------ pages

    /// Add a page: the bytes hit disk before the registry sees the reference,
    /// so a crash cannot leave a page record without its image.
    pub async fn add_page(
        &self,
        session_id: Uuid,
        data: Vec<u8>,
        original_name: &str,
        source: PageSource,
        mimetype: Option<&str>,
    ) -> Result<SessionPage> {
        // Fail fast before writing bytes for a session that does not exist.
        self.get(session_id)?;

        let page_id = Uuid::new_v4();
        let extension = resolve_extension(original_name, mimetype);
        let filename = format!("{}{}", page_id, extension);
        let path = self.repository.page_path(session_id, &filename)?;
        let metadata = PageMetadata::probe(&data, mimetype);
        tokio::fs::write(&path, &data).await?;

        let now = Utc::now();
        let original_name = if original_name.is_empty() {
            filename.clone()
        } else {
            original_name.to_string()
        };
        let page = SessionPage {
            id: page_id,
            index: 0, // re-derived under the lock
            filename,
            original_name,
            source,
            metadata,
            created_at: now,
            updated_at: now,
        };

        let snapshot = self.mutate(session_id, |session| {
            session.pages.push(page);
            invalidate_document(session);
        })?;
        snapshot
            .page(page_id)
            .cloned()
            .ok_or(ReflowError::PageNotFound {
                session: session_id,
                page: page_id,
            })
    }

    /// Remove a page. Unknown page ids leave the session untouched and
    /// return the current snapshot.
    pub fn remove_page(&self, session_id: Uuid, page_id: Uuid) -> Result<SessionDetail> {
        self.mutate(session_id, |session| {
            let before = session.pages.len();
            session.pages.retain(|page| page.id != page_id);
            if session.pages.len() != before {
                invalidate_document(session);
            }
        })
    }

    /// Reorder pages to match `order`. Ids that do not belong to the session
    /// are silently dropped (stale client state must not fail the whole
    /// operation); pages omitted from `order` are removed.
    pub fn reorder_pages(&self, session_id: Uuid, order: &[Uuid]) -> Result<SessionDetail> {
        self.mutate(session_id, |session| {
            let mut by_id: HashMap<Uuid, SessionPage> =
                session.pages.drain(..).map(|page| (page.id, page)).collect();
            session.pages = order
                .iter()
                .filter_map(|page_id| by_id.remove(page_id))
                .collect();
            invalidate_document(session);
        })
    }

    /// On-disk path of a page's image bytes.
    pub fn page_path(&self, session_id: Uuid, page_id: Uuid) -> Result<PathBuf> {
        let session = self.get(session_id)?;
        let page = session.page(page_id).ok_or(ReflowError::PageNotFound {
            session: session_id,
            page: page_id,
        })?;
        self.repository.page_path(session_id, &page.filename)
    }

    // ------------------------------------------------------------- lifecycle

    /// Transition to `processing`, clearing any previous error.
    pub fn mark_processing(&self, session_id: Uuid) -> Result<SessionDetail> {
        self.mutate(session_id, |session| {
            session.status = SessionStatus::Processing;
            session.last_error = None;
        })
    }

    /// Record a failed recognition run.
    pub fn mark_error(&self, session_id: Uuid, message: &str) -> Result<SessionDetail> {
        self.mutate(session_id, |session| {
            session.status = SessionStatus::Error;
            session.last_error = Some(message.to_string());
        })
    }

    /// Attach a recognized document and transition to `ready`.
    pub fn save_document(&self, session_id: Uuid, document: Document) -> Result<SessionDetail> {
        self.mutate(session_id, |session| {
            session.document = Some(document.clone());
            session.status = SessionStatus::Ready;
            session.last_recognized_at = Some(Utc::now());
            session.last_error = None;
        })
    }

    // -------------------------------------------------------------- internal

    /// Run one serialized mutation: apply `f`, re-derive page indices, bump
    /// the update timestamp, mark dirty, return the new snapshot.
    fn mutate<F>(&self, session_id: Uuid, f: F) -> Result<SessionDetail>
    where
        F: FnOnce(&mut SessionDetail),
    {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or(ReflowError::SessionNotFound(session_id))?;
        f(session);
        session.reindex_pages(Utc::now());
        let snapshot = session.clone();
        inner.dirty.insert(session_id);
        Ok(snapshot)
    }

    /// Direct repository access for the archive codec.
    pub(crate) fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    /// Register a fully-formed session (archive import path).
    pub(crate) fn insert(&self, session: SessionDetail) {
        let mut inner = self.inner.lock();
        inner.dirty.insert(session.id);
        inner.sessions.insert(session.id, session);
    }
}

/// A structural page change invalidates prior recognition: the attached
/// document is dropped and a `ready` session goes back to `draft`.
fn invalidate_document(session: &mut SessionDetail) {
    session.document = None;
    if session.status == SessionStatus::Ready {
        session.status = SessionStatus::Draft;
    }
}
