//! Prescription database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{ExtractedData, PrescriptionRecord, PrescriptionStatus, SafetyAnalysis};

const COLUMNS: &str = "session_id, raw_text, extracted_data, safety_analysis, status, version, \
                       verified_by, content_hash, created_at, updated_at, confirmed_at";

impl Database {
    /// Insert a new prescription record.
    pub fn insert_prescription(&self, record: &PrescriptionRecord) -> DbResult<()> {
        let extracted_data_json = serde_json::to_string(&record.extracted_data)?;
        let safety_analysis_json = serde_json::to_string(&record.safety_analysis)?;

        self.conn.execute(
            r#"
            INSERT INTO prescriptions (
                session_id, raw_text, extracted_data, safety_analysis,
                safety_score, overall_risk, status, version,
                verified_by, content_hash, created_at, updated_at, confirmed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                record.session_id,
                record.raw_text,
                extracted_data_json,
                safety_analysis_json,
                record.safety_analysis.safety_score,
                record.safety_analysis.overall_risk.as_str(),
                record.status.as_str(),
                record.version,
                record.verified_by,
                record.content_hash,
                record.created_at,
                record.updated_at,
                record.confirmed_at,
            ],
        )?;

        tracing::debug!(session_id = %record.session_id, "inserted prescription");
        Ok(())
    }

    /// Save a modified record if the stored version still equals `expected_version`.
    ///
    /// The record's own `version` becomes the stored version.
    pub fn update_prescription(
        &self,
        record: &PrescriptionRecord,
        expected_version: u32,
    ) -> DbResult<()> {
        let extracted_data_json = serde_json::to_string(&record.extracted_data)?;
        let safety_analysis_json = serde_json::to_string(&record.safety_analysis)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE prescriptions SET
                extracted_data = ?2,
                safety_analysis = ?3,
                safety_score = ?4,
                overall_risk = ?5,
                status = ?6,
                version = ?7,
                verified_by = ?8,
                content_hash = ?9,
                updated_at = ?10,
                confirmed_at = ?11
            WHERE session_id = ?1 AND version = ?12
            "#,
            params![
                record.session_id,
                extracted_data_json,
                safety_analysis_json,
                record.safety_analysis.safety_score,
                record.safety_analysis.overall_risk.as_str(),
                record.status.as_str(),
                record.version,
                record.verified_by,
                record.content_hash,
                record.updated_at,
                record.confirmed_at,
                expected_version,
            ],
        )?;

        if rows_affected > 0 {
            return Ok(());
        }

        let actual: Option<u32> = self
            .conn
            .query_row(
                "SELECT version FROM prescriptions WHERE session_id = ?",
                [&record.session_id],
                |row| row.get(0),
            )
            .optional()?;

        match actual {
            None => Err(DbError::NotFound(record.session_id.clone())),
            Some(actual) => {
                tracing::warn!(
                    session_id = %record.session_id,
                    expected = expected_version,
                    actual,
                    "stale prescription update rejected"
                );
                Err(DbError::VersionConflict {
                    session_id: record.session_id.clone(),
                    expected: expected_version,
                    actual,
                })
            }
        }
    }

    /// Get a prescription by session ID.
    pub fn get_prescription(&self, session_id: &str) -> DbResult<Option<PrescriptionRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM prescriptions WHERE session_id = ?", COLUMNS),
                [session_id],
                prescription_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List prescriptions awaiting verification, lowest safety score first.
    pub fn list_pending_review(&self) -> DbResult<Vec<PrescriptionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM prescriptions WHERE status = 'pending' \
             ORDER BY safety_score ASC, created_at ASC",
            COLUMNS
        ))?;

        let rows = stmt.query_map([], prescription_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// List prescriptions by status, newest first.
    pub fn list_prescriptions_by_status(
        &self,
        status: PrescriptionStatus,
    ) -> DbResult<Vec<PrescriptionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM prescriptions WHERE status = ? ORDER BY updated_at DESC",
            COLUMNS
        ))?;

        let rows = stmt.query_map([status.as_str()], prescription_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }

    /// Delete a prescription and its reminders.
    pub fn delete_prescription(&self, session_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM prescriptions WHERE session_id = ?", [session_id])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct PrescriptionRow {
    session_id: String,
    raw_text: String,
    extracted_data: String,
    safety_analysis: String,
    status: String,
    version: u32,
    verified_by: Option<String>,
    content_hash: Option<String>,
    created_at: String,
    updated_at: String,
    confirmed_at: Option<String>,
}

fn prescription_row(row: &Row<'_>) -> rusqlite::Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        session_id: row.get(0)?,
        raw_text: row.get(1)?,
        extracted_data: row.get(2)?,
        safety_analysis: row.get(3)?,
        status: row.get(4)?,
        version: row.get(5)?,
        verified_by: row.get(6)?,
        content_hash: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        confirmed_at: row.get(10)?,
    })
}

impl TryFrom<PrescriptionRow> for PrescriptionRecord {
    type Error = DbError;

    fn try_from(row: PrescriptionRow) -> Result<Self, Self::Error> {
        let extracted_data: ExtractedData = serde_json::from_str(&row.extracted_data)?;
        let safety_analysis: SafetyAnalysis = serde_json::from_str(&row.safety_analysis)?;
        let status = PrescriptionStatus::parse(&row.status).ok_or_else(|| {
            DbError::Constraint(format!("Unknown prescription status: {}", row.status))
        })?;

        Ok(PrescriptionRecord {
            session_id: row.session_id,
            raw_text: row.raw_text,
            extracted_data,
            safety_analysis,
            status,
            version: row.version,
            verified_by: row.verified_by,
            content_hash: row.content_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
            confirmed_at: row.confirmed_at,
        })
    }
}
