//! SQLite-backed session persistence.
//!
//! Keyed read/write/delete of the JSON-serialized session record, plus a
//! full reload at startup so live conversations survive a restart. Writes
//! during a turn are best-effort: a failed save is logged and the turn
//! completes anyway.

use std::path::PathBuf;

use rusqlite::{params, Connection};

use crate::error::StoreError;
use crate::session::Session;

/// SQLite storage for session records.
pub struct SessionStore {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
}

impl SessionStore {
    /// Open (and initialize if needed) the store at `db_path`.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self { db_path };
        store.initialize_db()?;
        Ok(store)
    }

    fn initialize_db(&self) -> Result<(), StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Upsert one session record.
    pub fn save(&self, session: &Session) -> Result<(), StoreError> {
        let data = serde_json::to_string(session)?;
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO sessions (session_id, data, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id) DO UPDATE SET data = ?2, updated_at = ?3",
            params![
                session.session_id,
                data,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Load one session by id.
    pub fn load(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare("SELECT data FROM sessions WHERE session_id = ?1")?;
        let mut rows = stmt.query(params![session_id])?;
        match rows.next()? {
            Some(row) => {
                let data: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    /// Load every persisted session, skipping records that no longer parse.
    pub fn load_all(&self) -> Result<Vec<Session>, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare("SELECT session_id, data FROM sessions")?;
        let rows = stmt.query_map([], |row| {
            let session_id: String = row.get(0)?;
            let data: String = row.get(1)?;
            Ok((session_id, data))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session_id, data) = row?;
            match serde_json::from_str(&data) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::error!("skipping unreadable session record {session_id}: {e}");
                }
            }
        }
        Ok(sessions)
    }

    /// Delete one session record; missing rows are fine.
    pub fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "DELETE FROM sessions WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(())
    }

    /// Save asynchronously. rusqlite is synchronous, so the operation runs
    /// on the blocking pool.
    pub async fn asave(&self, session: &Session) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let session = session.clone();
        tokio::task::spawn_blocking(move || {
            let store = SessionStore { db_path };
            store.save(&session)
        })
        .await?
    }

    /// Delete asynchronously on the blocking pool.
    pub async fn adelete(&self, session_id: &str) -> Result<(), StoreError> {
        let db_path = self.db_path.clone();
        let session_id = session_id.to_string();
        tokio::task::spawn_blocking(move || {
            let store = SessionStore { db_path };
            store.delete(&session_id)
        })
        .await?
    }
}
