//! SQLite store for prescriptions awaiting verification and their reminders.
//!
//! Several reviewers may open the same file. SQLite serializes their writes;
//! lost updates are caught by the `version` column checked in
//! [`Database::update_prescription`].

mod prescriptions;
mod reminders;
mod schema;

pub use schema::SCHEMA;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;

/// How long a write waits for another reviewer's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored extraction, analysis or reminder column failed to (de)serialize.
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored value is outside the set the schema allows.
    #[error("Invalid stored value: {0}")]
    Constraint(String),

    /// Another reviewer saved the prescription first.
    #[error("Version conflict on {session_id}: expected {expected}, found {actual}")]
    VersionConflict {
        session_id: String,
        expected: u32,
        actual: u32,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Prescription and reminder store backed by one SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the store at `path`, creating the file and tables if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::debug!(path = %path.display(), "opening prescription store");
        Self::with_schema(conn)
    }

    /// Private store that disappears when dropped.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
