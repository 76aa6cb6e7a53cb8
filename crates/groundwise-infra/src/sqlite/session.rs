//! SQLite session store implementation.
//!
//! Implements `SessionStore` from `groundwise-core` using sqlx with split
//! read/write pools. Each session is one row; the full record is stored as
//! JSON text and decoded on read.

use chrono::Utc;
use sqlx::Row;

use groundwise_core::memory::store::SessionStore;
use groundwise_types::error::PersistenceError;
use groundwise_types::session::{Session, SessionId};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionStore`.
pub struct SqliteSessionStore {
    pool: DatabasePool,
}

impl SqliteSessionStore {
    /// Create a new session store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn query_error(e: sqlx::Error) -> PersistenceError {
    PersistenceError::Io(e.to_string())
}

impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, id: &SessionId) -> Result<Session, PersistenceError> {
        let row = sqlx::query("SELECT state FROM sessions WHERE session_id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let Some(row) = row else {
            return Err(PersistenceError::NotFound);
        };
        let state: String = row
            .try_get("state")
            .map_err(|e| PersistenceError::Corrupt(e.to_string()))?;
        serde_json::from_str(&state).map_err(|e| PersistenceError::Corrupt(e.to_string()))
    }

    async fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        let state = serde_json::to_string(session)
            .map_err(|e| PersistenceError::Io(format!("failed to serialize session: {e}")))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO sessions (session_id, state, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (session_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at"#,
        )
        .bind(session.id.as_str())
        .bind(&state)
        .bind(session.created_at.to_rfc3339())
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionId>, PersistenceError> {
        let rows = sqlx::query("SELECT session_id FROM sessions ORDER BY session_id")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.try_get("session_id").map_err(query_error)?;
            match SessionId::new(&raw) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(session_id = %raw, error = %e, "Skipping invalid session id"),
            }
        }
        Ok(ids)
    }
}
