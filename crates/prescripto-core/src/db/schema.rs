//! SQLite schema definition.

/// Complete database schema for prescripto.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Prescriptions (verification staging area)
-- ============================================================================

CREATE TABLE IF NOT EXISTS prescriptions (
    session_id TEXT PRIMARY KEY,
    raw_text TEXT NOT NULL DEFAULT '',
    extracted_data TEXT NOT NULL,                -- JSON ExtractedData
    safety_analysis TEXT NOT NULL,               -- JSON SafetyAnalysis
    safety_score INTEGER NOT NULL CHECK (safety_score BETWEEN 0 AND 100),
    overall_risk TEXT NOT NULL CHECK (overall_risk IN ('low', 'medium', 'high')),
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'confirmed', 'rejected')),
    version INTEGER NOT NULL DEFAULT 1,
    verified_by TEXT,
    content_hash TEXT,                           -- SHA-256 hex, set on confirmation
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    confirmed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_prescriptions_status ON prescriptions(status);
CREATE INDEX IF NOT EXISTS idx_prescriptions_score ON prescriptions(safety_score);

-- ============================================================================
-- SMS Reminders
-- ============================================================================

CREATE TABLE IF NOT EXISTS reminders (
    reminder_id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES prescriptions(session_id) ON DELETE CASCADE,
    patient_name TEXT NOT NULL DEFAULT '',
    phone_number TEXT NOT NULL,
    medicines TEXT NOT NULL DEFAULT '[]',        -- JSON array of ReminderMedicine
    morning INTEGER NOT NULL DEFAULT 1,
    afternoon INTEGER NOT NULL DEFAULT 0,
    night INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,                      -- RFC 3339 UTC, compared lexically
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_reminders_session ON reminders(session_id);
CREATE INDEX IF NOT EXISTS idx_reminders_active ON reminders(is_active, end_date);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_status_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let insert = "INSERT INTO prescriptions (session_id, extracted_data, safety_analysis, safety_score, overall_risk, status, created_at, updated_at) VALUES (?1, '{}', '{}', ?2, 'low', ?3, '', '')";

        assert!(conn.execute(insert, rusqlite::params!["a", 100, "archived"]).is_err());
        assert!(conn.execute(insert, rusqlite::params!["b", 101, "pending"]).is_err());
        assert!(conn.execute(insert, rusqlite::params!["c", 90, "pending"]).is_ok());
    }

    #[test]
    fn test_reminder_requires_prescription() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO reminders (reminder_id, session_id, phone_number, start_date, end_date) VALUES ('r1', 'missing', '+15550000000', '', '')",
            [],
        );
        assert!(result.is_err());
    }
}
