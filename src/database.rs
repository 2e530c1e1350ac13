use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

use crate::auth::Principal;
use crate::models::Task;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Stored session is corrupt: {0}")]
    CorruptSession(String),
}

/// Local SQLite file holding the signed-in session and a per-owner copy of
/// the last task list seen, so the UI has something to show before the
/// remote store answers.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS cached_tasks (
                owner           TEXT NOT NULL,
                position        INTEGER NOT NULL,
                id              TEXT NOT NULL,
                description     TEXT NOT NULL,
                due_date        TEXT,
                due_time        TEXT,
                completed       INTEGER DEFAULT 0,
                PRIMARY KEY (owner, id)
            )",
            [],
        )?;

        // At most one signed-in session per profile
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS session (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                uid             TEXT NOT NULL,
                email           TEXT NOT NULL,
                id_token        TEXT NOT NULL,
                refresh_token   TEXT NOT NULL,
                expires_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_cached_tasks_owner ON cached_tasks(owner, position)",
            [],
        )?;

        Ok(())
    }

    /// Replace the cached list for `owner`, keeping the given order
    pub fn replace_cached_tasks(&self, owner: &str, tasks: &[Task]) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM cached_tasks WHERE owner = ?1", rusqlite::params![owner])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO cached_tasks (owner, position, id, description, due_date, due_time, completed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, task) in tasks.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    owner,
                    position as i64,
                    task.id,
                    task.description,
                    task.due_date,
                    task.due_time,
                    if task.completed { 1 } else { 0 },
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
        Ok(Task {
            id: row.get(0)?,
            description: row.get(1)?,
            due_date: row.get(2)?,
            due_time: row.get(3)?,
            completed: row.get::<_, i64>(4)? != 0,
        })
    }

    pub fn get_cached_tasks(&self, owner: &str) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, description, due_date, due_time, completed
             FROM cached_tasks WHERE owner = ?1 ORDER BY position ASC",
        )?;
        let tasks = stmt
            .query_map(rusqlite::params![owner], Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn clear_cached_tasks(&self, owner: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM cached_tasks WHERE owner = ?1", rusqlite::params![owner])?;
        Ok(())
    }

    pub fn save_session(&self, principal: &Principal) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session (id, uid, email, id_token, refresh_token, expires_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                principal.uid,
                principal.email,
                principal.id_token,
                principal.refresh_token,
                principal.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<Principal>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT uid, email, id_token, refresh_token, expires_at FROM session WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((uid, email, id_token, refresh_token, expires_at)) = row else {
            return Ok(None);
        };

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|e| DatabaseError::CorruptSession(e.to_string()))?
            .with_timezone(&Utc);

        Ok(Some(Principal {
            uid,
            email,
            id_token,
            refresh_token,
            expires_at,
        }))
    }

    pub fn clear_session(&self) -> Result<(), DatabaseError> {
        self.conn.execute("DELETE FROM session", [])?;
        Ok(())
    }
}
