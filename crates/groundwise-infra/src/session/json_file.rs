//! One JSON file per session.
//!
//! Records live at `{dir}/session_{id}.json`. Writes go to a sibling temp
//! file that is flushed to disk and then renamed over the record, so a
//! crash or power loss mid-write leaves the previous version intact.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use groundwise_core::memory::store::SessionStore;
use groundwise_types::error::PersistenceError;
use groundwise_types::session::{Session, SessionId};

const FILE_PREFIX: &str = "session_";
const FILE_SUFFIX: &str = ".json";

/// Filesystem-backed implementation of `SessionStore`.
pub struct JsonFileSessionStore {
    dir: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `id`.
    pub fn session_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }

    fn temp_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}.tmp"))
    }
}

/// Session id encoded in a record file name, if it is one.
fn id_from_file_name(name: &str) -> Option<SessionId> {
    let raw = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    SessionId::new(raw).ok()
}

impl SessionStore for JsonFileSessionStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn load(&self, id: &SessionId) -> Result<Session, PersistenceError> {
        let path = self.session_path(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound);
            }
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                return Err(PersistenceError::Corrupt(format!("{}: {err}", path.display())));
            }
            Err(err) => return Err(err.into()),
        };

        serde_json::from_str(&content)
            .map_err(|e| PersistenceError::Corrupt(format!("{}: {e}", path.display())))
    }

    async fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| PersistenceError::Io(format!("failed to serialize session: {e}")))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.temp_path(&session.id);
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, self.session_path(&session.id)).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionId>, PersistenceError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = entry.file_name().to_str().and_then(id_from_file_name) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
