//! Portable `.reflow-session` archives.
//!
//! A session plus its page bytes round-trips through one deflate-compressed
//! zip container: a `session.json` manifest entry and one `pages/<filename>`
//! entry per page. Import never reuses the source's identifiers — a fresh
//! session id and fresh page ids keep an imported copy from colliding with
//! anything already registered.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ReflowError, Result};

use super::model::{resolve_extension, SessionDetail, SessionPage, SessionStatus};
use super::store::SessionStore;

/// File extension of the archive container.
pub const ARCHIVE_EXTENSION: &str = "reflow-session";

const MANIFEST_ENTRY: &str = "session.json";
const PAGES_PREFIX: &str = "pages/";

fn zip_io(err: zip::result::ZipError) -> ReflowError {
    ReflowError::Storage(std::io::Error::other(err))
}

/// Serialize a session and its page bytes into a temp-file archive.
///
/// Page files missing from storage are skipped rather than failing the whole
/// export. The caller owns the returned file and must remove it once the
/// archive has been delivered.
pub fn export_session(store: &SessionStore, session_id: Uuid) -> Result<PathBuf> {
    let session = store.get(session_id)?;

    let path = std::env::temp_dir().join(format!("{}.{}", session_id, ARCHIVE_EXTENSION));
    let file = std::fs::File::create(&path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = serde_json::to_string_pretty(&session)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    writer.start_file(MANIFEST_ENTRY, options).map_err(zip_io)?;
    writer.write_all(manifest.as_bytes())?;

    for page in &session.pages {
        let page_path = store.repository().page_path(session_id, &page.filename)?;
        let data = match std::fs::read(&page_path) {
            Ok(data) => data,
            Err(_) => {
                tracing::warn!(
                    "Page file {} missing from storage, skipping in export",
                    page.filename
                );
                continue;
            }
        };
        writer
            .start_file(format!("{}{}", PAGES_PREFIX, page.filename), options)
            .map_err(zip_io)?;
        writer.write_all(&data)?;
    }

    writer.finish().map_err(zip_io)?;
    Ok(path)
}

/// Deserialize an archive into a brand-new draft session registered with the
/// store.
///
/// A page referenced by the manifest but absent from the payload is imported
/// with empty bytes. A missing or malformed manifest fails the whole import
/// with `InvalidArchive` and registers nothing.
pub async fn import_session(store: &SessionStore, data: Vec<u8>) -> Result<SessionDetail> {
    let mut archive = ZipArchive::new(std::io::Cursor::new(&data))
        .map_err(|err| ReflowError::InvalidArchive(err.to_string()))?;

    let manifest = {
        let mut entry = archive
            .by_name(MANIFEST_ENTRY)
            .map_err(|_| ReflowError::InvalidArchive("archive missing session.json".to_string()))?;
        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        contents
    };
    let source: SessionDetail = serde_json::from_str(&manifest)
        .map_err(|err| ReflowError::InvalidArchive(format!("malformed session.json: {err}")))?;

    let mut payloads: HashMap<String, Vec<u8>> = HashMap::new();
    for page in &source.pages {
        let mut bytes = Vec::new();
        if let Ok(mut entry) = archive.by_name(&format!("{}{}", PAGES_PREFIX, page.filename)) {
            entry.read_to_end(&mut bytes)?;
        }
        payloads.insert(page.filename.clone(), bytes);
    }

    let now = Utc::now();
    let new_id = Uuid::new_v4();
    let mut new_pages = Vec::with_capacity(source.pages.len());
    for (idx, page) in source.pages.iter().enumerate() {
        let new_page_id = Uuid::new_v4();
        let extension = resolve_extension(&page.filename, page.metadata.mimetype.as_deref());
        let filename = format!("{}{}", new_page_id, extension);
        let dest = store.repository().page_path(new_id, &filename)?;
        let bytes = payloads.remove(&page.filename).unwrap_or_default();
        tokio::fs::write(&dest, &bytes).await?;

        new_pages.push(SessionPage {
            id: new_page_id,
            index: idx,
            filename,
            original_name: page.original_name.clone(),
            source: page.source,
            metadata: page.metadata.clone(),
            created_at: now,
            updated_at: now,
        });
    }

    let imported = SessionDetail {
        id: new_id,
        name: format!("{} (imported)", source.name),
        description: source.description,
        created_at: now,
        updated_at: now,
        page_count: new_pages.len(),
        status: SessionStatus::Draft,
        last_error: None,
        last_recognized_at: None,
        document: None,
        pages: new_pages,
    };
    store.insert(imported.clone());
    Ok(imported)
}
