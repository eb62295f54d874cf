//! Disk persistence for sessions and their page images.
//!
//! Layout: `<data_root>/sessions/<sessionId>/session.json` for metadata and
//! `<data_root>/sessions/<sessionId>/pages/<pageId><ext>` for raw page bytes.
//! The repository holds no in-memory state; the store above it decides when
//! to read and write.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::Result;

use super::model::SessionDetail;

/// Metadata file name inside a session directory.
const MANIFEST: &str = "session.json";

pub struct SessionRepository {
    sessions_dir: PathBuf,
}

impl SessionRepository {
    /// Create a repository rooted at `data_root`, ensuring the sessions
    /// directory exists.
    pub fn new(data_root: &Path) -> Result<Self> {
        let sessions_dir = data_root.join("sessions");
        std::fs::create_dir_all(&sessions_dir)?;
        Ok(Self { sessions_dir })
    }

    fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.sessions_dir.join(session_id.to_string())
    }

    /// Load every session that has a parsable manifest. Directories with a
    /// missing or corrupt manifest are skipped so one broken session cannot
    /// prevent the rest from loading.
    pub fn load_all(&self) -> Result<Vec<SessionDetail>> {
        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.sessions_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let manifest = entry.path().join(MANIFEST);
            let contents = match std::fs::read_to_string(&manifest) {
                Ok(contents) => contents,
                Err(_) => continue,
            };
            match serde_json::from_str::<SessionDetail>(&contents) {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    tracing::warn!("Skipping corrupt session manifest {}: {}", manifest.display(), err);
                }
            }
        }
        Ok(sessions)
    }

    /// Persist one session's manifest, creating its directory if needed.
    pub fn save(&self, session: &SessionDetail) -> Result<()> {
        let dir = self.session_dir(session.id);
        std::fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(session)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(dir.join(MANIFEST), json)?;
        Ok(())
    }

    /// Remove a session's directory and everything under it. Tolerates the
    /// directory already being gone.
    pub fn delete(&self, session_id: Uuid) -> Result<()> {
        let dir = self.session_dir(session_id);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// The pages directory for a session, created on first use.
    pub fn pages_dir(&self, session_id: Uuid) -> Result<PathBuf> {
        let dir = self.session_dir(session_id).join("pages");
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// On-disk path for a stored page file.
    pub fn page_path(&self, session_id: Uuid, filename: &str) -> Result<PathBuf> {
        Ok(self.pages_dir(session_id)?.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::{SessionStatus, SessionDetail};
    use chrono::Utc;

    fn sample_session() -> SessionDetail {
        let now = Utc::now();
        SessionDetail {
            id: Uuid::new_v4(),
            name: "sample".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
            page_count: 0,
            status: SessionStatus::Draft,
            last_error: None,
            last_recognized_at: None,
            document: None,
            pages: vec![],
        }
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path()).unwrap();
        let session = sample_session();
        repo.save(&session).unwrap();

        let loaded = repo.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], session);
    }

    #[test]
    fn load_all_skips_corrupt_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path()).unwrap();
        let good = sample_session();
        repo.save(&good).unwrap();

        // One directory with garbage, one with no manifest at all
        let bad = dir.path().join("sessions").join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("session.json"), "{ not json").unwrap();
        let empty = dir.path().join("sessions").join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&empty).unwrap();

        let loaded = repo.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, good.id);
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path()).unwrap();
        let session = sample_session();
        repo.save(&session).unwrap();

        repo.delete(session.id).unwrap();
        assert!(repo.load_all().unwrap().is_empty());
        // Second delete is a no-op
        repo.delete(session.id).unwrap();
    }

    #[test]
    fn page_path_lives_under_pages_dir() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SessionRepository::new(dir.path()).unwrap();
        let id = Uuid::new_v4();
        let path = repo.page_path(id, "abc.png").unwrap();
        assert!(path.ends_with(format!("{}/pages/abc.png", id)));
        assert!(path.parent().unwrap().is_dir());
    }
}
