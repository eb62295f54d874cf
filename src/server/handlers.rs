//! HTTP request handlers.
//!
//! Handlers stay thin: validate, call into the session store / task manager /
//! pipeline, map domain errors onto status codes. The recognize handler is
//! the one with real coupling — its task body must keep registry state and
//! broker messages in step when a run fails.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::error::ReflowError;
use crate::exporters::{ExportRequest, ExporterRegistry};
use crate::pipeline::RecognitionPipeline;
use crate::session::{
    export_session, import_session, PageSource, SessionCreate, SessionDetail, SessionStore,
    SessionSummary, SessionUpdate, ARCHIVE_EXTENSION,
};
use crate::tasks::{ProgressEvent, TaskManager};

use super::types::*;

/// Application state shared across all handlers
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub tasks: Arc<TaskManager>,
    pub pipeline: Arc<RecognitionPipeline>,
    pub exporters: ExporterRegistry,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>, tasks: Arc<TaskManager>) -> Arc<Self> {
        Arc::new(Self {
            store,
            tasks,
            pipeline: Arc::new(RecognitionPipeline::default()),
            exporters: ExporterRegistry::default(),
        })
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

/// Map a domain error onto a status code and wire body.
fn api_error(err: ReflowError) -> ApiError {
    let (status, code) = match &err {
        ReflowError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
        ReflowError::PageNotFound { .. } => (StatusCode::NOT_FOUND, "PAGE_NOT_FOUND"),
        ReflowError::DocumentNotReady(_) => (StatusCode::NOT_FOUND, "DOCUMENT_NOT_READY"),
        ReflowError::InvalidArchive(_) => (StatusCode::BAD_REQUEST, "INVALID_ARCHIVE"),
        ReflowError::EmptySession(_) => (StatusCode::BAD_REQUEST, "EMPTY_SESSION"),
        ReflowError::UnsupportedFormat(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT"),
        ReflowError::Recognition(_) => (StatusCode::INTERNAL_SERVER_ERROR, "RECOGNITION_FAILED"),
        ReflowError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE"),
    };
    (status, Json(ErrorResponse::with_code(err.to_string(), code)))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::with_code(err.to_string(), "INVALID_MULTIPART")),
    )
}

// =============================================================================
// Health
// =============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// =============================================================================
// Session CRUD
// =============================================================================

pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionSummary>> {
    Json(state.store.list())
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionCreate>,
) -> (StatusCode, Json<SessionDetail>) {
    let session = state.store.create(payload);
    tracing::info!("Created session {}", session.id);
    (StatusCode::CREATED, Json(session))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    state.store.get(session_id).map(Json).map_err(api_error)
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SessionUpdate>,
) -> ApiResult<Json<SessionDetail>> {
    state
        .store
        .update(session_id, payload)
        .map(Json)
        .map_err(api_error)
}

/// Delete is a destructive convenience: removing an id that is already gone
/// still returns 204.
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete(session_id).map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Pages
// =============================================================================

pub async fn upload_pages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<SessionDetail>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let original_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "page.png".to_string());
        let mimetype = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?.to_vec();

        state
            .store
            .add_page(
                session_id,
                data,
                &original_name,
                PageSource::File,
                mimetype.as_deref(),
            )
            .await
            .map_err(api_error)?;
    }
    state.store.get(session_id).map(Json).map_err(api_error)
}

pub async fn reorder_pages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<ReorderRequest>,
) -> ApiResult<Json<SessionDetail>> {
    state
        .store
        .reorder_pages(session_id, &payload.order)
        .map(Json)
        .map_err(api_error)
}

pub async fn delete_page(
    State(state): State<Arc<AppState>>,
    Path((session_id, page_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SessionDetail>> {
    state
        .store
        .remove_page(session_id, page_id)
        .map(Json)
        .map_err(api_error)
}

// =============================================================================
// Archive
// =============================================================================

pub async fn download_archive(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<([(header::HeaderName, String); 2], Vec<u8>)> {
    let archive_path = export_session(&state.store, session_id).map_err(api_error)?;
    let bytes = tokio::fs::read(&archive_path)
        .await
        .map_err(|err| api_error(err.into()))?;
    // The export produced a temp file; it is ours to clean up once read.
    if let Err(err) = tokio::fs::remove_file(&archive_path).await {
        tracing::warn!("Failed to remove archive temp file: {}", err);
    }

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}.{}\"",
                    session_id, ARCHIVE_EXTENSION
                ),
            ),
        ],
        bytes,
    ))
}

pub async fn import_archive(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<SessionDetail>> {
    let field = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_code(
                    "archive file missing from request",
                    "INVALID_ARCHIVE",
                )),
            )
        })?;
    let data = field.bytes().await.map_err(multipart_error)?.to_vec();

    let imported = import_session(&state.store, data).await.map_err(api_error)?;
    tracing::info!("Imported session {} ({} pages)", imported.id, imported.page_count);
    Ok(Json(imported))
}

// =============================================================================
// Document + export
// =============================================================================

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<crate::document::Document>> {
    let session = state.store.get(session_id).map_err(api_error)?;
    session
        .document
        .map(Json)
        .ok_or_else(|| api_error(ReflowError::DocumentNotReady(session_id)))
}

pub async fn export_document(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<ExportPayload>,
) -> ApiResult<([(header::HeaderName, String); 2], Vec<u8>)> {
    let session = state.store.get(session_id).map_err(api_error)?;
    let document = session.document.as_ref().ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_code(
                format!("Document for session {} is not ready yet", session_id),
                "DOCUMENT_NOT_READY",
            )),
        )
    })?;

    let filename_hint = sanitize_filename(&session.name);
    let request = ExportRequest {
        format: payload.format,
        filename_hint,
    };
    let result = state
        .exporters
        .export(document, &request)
        .map_err(api_error)?;

    Ok((
        [
            (header::CONTENT_TYPE, result.media_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", result.filename),
            ),
        ],
        result.content,
    ))
}

fn sanitize_filename(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if stem.chars().all(|c| c == '_') {
        "document".to_string()
    } else {
        stem
    }
}

// =============================================================================
// Events + recognition
// =============================================================================

/// Live progress feed for a session as Server-Sent Events. Heartbeats keep
/// quiet streams alive; the stream closes itself after the first terminal
/// task event.
pub async fn session_events(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    state.store.get(session_id).map_err(api_error)?;

    let stream = state.tasks.stream(session_id).map(|event| {
        let json = serde_json::to_string(&event)
            .unwrap_or_else(|_| format!("{{\"event\":\"{}\"}}", event.tag()));
        Ok(Event::default().data(json))
    });
    Ok(Sse::new(stream))
}

/// Kick off a recognition run and return its task id immediately.
///
/// The task body owns the failure bookkeeping: a failed run must both mark
/// the session errored and publish `recognition-error` before the task layer
/// reports `task-failed`, or observers and persisted state would disagree.
pub async fn recognize_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<RecognizeResponse>> {
    let session = state.store.get(session_id).map_err(api_error)?;
    if session.pages.is_empty() {
        return Err(api_error(ReflowError::EmptySession(session_id)));
    }
    state.store.mark_processing(session_id).map_err(api_error)?;

    let store = state.store.clone();
    let tasks = state.tasks.clone();
    let pipeline = state.pipeline.clone();
    let work = async move {
        match pipeline.run(session_id, &store, &tasks).await {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Err(mark_err) = store.mark_error(session_id, &err.to_string()) {
                    tracing::warn!(
                        "Could not record recognition error on session {}: {}",
                        session_id,
                        mark_err
                    );
                }
                tasks.publish(
                    session_id,
                    &ProgressEvent::RecognitionError {
                        message: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    };

    let task_id = state.tasks.start_task(session_id, "recognition", work);
    Ok(Json(RecognizeResponse { task_id }))
}
