//! Reminder database operations.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{Reminder, ReminderMedicine, ReminderSlot, ReminderSlots};

const COLUMNS: &str = "reminder_id, session_id, patient_name, phone_number, medicines, \
                       morning, afternoon, night, is_active, start_date, end_date";

impl Database {
    /// Insert a new reminder. The prescription must exist.
    pub fn insert_reminder(&self, reminder: &Reminder) -> DbResult<()> {
        let medicines_json = serde_json::to_string(&reminder.medicines)?;

        self.conn.execute(
            r#"
            INSERT INTO reminders (
                reminder_id, session_id, patient_name, phone_number, medicines,
                morning, afternoon, night, is_active, start_date, end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                reminder.reminder_id,
                reminder.session_id,
                reminder.patient_name,
                reminder.phone_number,
                medicines_json,
                reminder.slots.morning,
                reminder.slots.afternoon,
                reminder.slots.night,
                reminder.is_active,
                reminder.start_date,
                reminder.end_date,
            ],
        )?;

        tracing::debug!(
            reminder_id = %reminder.reminder_id,
            session_id = %reminder.session_id,
            "inserted reminder"
        );
        Ok(())
    }

    /// Get a reminder by ID.
    pub fn get_reminder(&self, reminder_id: &str) -> DbResult<Option<Reminder>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM reminders WHERE reminder_id = ?", COLUMNS),
                [reminder_id],
                reminder_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List active reminders for a prescription.
    pub fn list_active_reminders_for_session(&self, session_id: &str) -> DbResult<Vec<Reminder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM reminders WHERE session_id = ? AND is_active = 1 ORDER BY created_at",
            COLUMNS
        ))?;

        let rows = stmt.query_map([session_id], reminder_row)?;

        let mut reminders = Vec::new();
        for row in rows {
            reminders.push(row?.try_into()?);
        }
        Ok(reminders)
    }

    /// Deactivate a reminder. Returns false if it does not exist.
    pub fn cancel_reminder(&self, reminder_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE reminders SET is_active = 0 WHERE reminder_id = ?",
            [reminder_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Reminders that should fire in `slot`: active, slot enabled, not yet expired.
    pub fn list_due_reminders(
        &self,
        slot: ReminderSlot,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Reminder>> {
        // Column name comes from a fixed set, never from input.
        let slot_column = match slot {
            ReminderSlot::Morning => "morning",
            ReminderSlot::Afternoon => "afternoon",
            ReminderSlot::Night => "night",
        };
        let now = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM reminders WHERE is_active = 1 AND {} = 1 AND end_date >= ? \
             ORDER BY created_at",
            COLUMNS, slot_column
        ))?;

        let rows = stmt.query_map([now], reminder_row)?;

        let mut reminders = Vec::new();
        for row in rows {
            reminders.push(row?.try_into()?);
        }
        Ok(reminders)
    }
}

/// Intermediate row struct for database mapping.
struct ReminderRow {
    reminder_id: String,
    session_id: String,
    patient_name: String,
    phone_number: String,
    medicines: String,
    morning: bool,
    afternoon: bool,
    night: bool,
    is_active: bool,
    start_date: String,
    end_date: String,
}

fn reminder_row(row: &Row<'_>) -> rusqlite::Result<ReminderRow> {
    Ok(ReminderRow {
        reminder_id: row.get(0)?,
        session_id: row.get(1)?,
        patient_name: row.get(2)?,
        phone_number: row.get(3)?,
        medicines: row.get(4)?,
        morning: row.get(5)?,
        afternoon: row.get(6)?,
        night: row.get(7)?,
        is_active: row.get(8)?,
        start_date: row.get(9)?,
        end_date: row.get(10)?,
    })
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = DbError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let medicines: Vec<ReminderMedicine> = serde_json::from_str(&row.medicines)?;

        Ok(Reminder {
            reminder_id: row.reminder_id,
            session_id: row.session_id,
            patient_name: row.patient_name,
            phone_number: row.phone_number,
            medicines,
            slots: ReminderSlots {
                morning: row.morning,
                afternoon: row.afternoon,
                night: row.night,
            },
            is_active: row.is_active,
            start_date: row.start_date,
            end_date: row.end_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrescriptionRecord, RawExtraction};
    use crate::safety::SafetyPolicy;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn setup_db() -> (Database, PrescriptionRecord) {
        let db = Database::open_in_memory().unwrap();
        let json = r#"{"patientName": "Ravi", "medicines": [
            {"name": "Amlodipine", "dosage": "5", "frequency": "OD", "timing": "AC", "confidence": "high"},
            {"name": "Metformin", "dosage": "500", "frequency": "BD", "timing": "PC", "confidence": "high"}
        ]}"#;
        let raw = RawExtraction::from_json(json).unwrap();
        let record = PrescriptionRecord::from_extraction(json.into(), &raw, &SafetyPolicy::default());
        db.insert_prescription(&record).unwrap();
        (db, record)
    }

    fn make_reminder(record: &PrescriptionRecord, days: u32) -> Reminder {
        Reminder::for_prescription(record, "+919876543210", None, Some(days), now()).unwrap()
    }

    #[test]
    fn test_insert_and_get_reminder() {
        let (db, record) = setup_db();
        let reminder = make_reminder(&record, 7);

        db.insert_reminder(&reminder).unwrap();

        let retrieved = db.get_reminder(&reminder.reminder_id).unwrap().unwrap();
        assert_eq!(retrieved, reminder);
        assert_eq!(retrieved.medicines[1].timing, "After food");
    }

    #[test]
    fn test_reminder_requires_prescription() {
        let (db, record) = setup_db();
        let mut reminder = make_reminder(&record, 7);
        reminder.session_id = "missing".into();

        assert!(db.insert_reminder(&reminder).is_err());
    }

    #[test]
    fn test_cancel_reminder() {
        let (db, record) = setup_db();
        let reminder = make_reminder(&record, 7);
        db.insert_reminder(&reminder).unwrap();

        assert_eq!(db.list_active_reminders_for_session(&record.session_id).unwrap().len(), 1);
        assert!(db.cancel_reminder(&reminder.reminder_id).unwrap());
        assert!(db.list_active_reminders_for_session(&record.session_id).unwrap().is_empty());
        assert!(!db.cancel_reminder("missing").unwrap());
    }

    #[test]
    fn test_list_due_reminders() {
        let (db, record) = setup_db();
        let reminder = make_reminder(&record, 2);
        db.insert_reminder(&reminder).unwrap();

        // OD + BD derive morning and night only.
        assert_eq!(db.list_due_reminders(ReminderSlot::Morning, now()).unwrap().len(), 1);
        assert_eq!(db.list_due_reminders(ReminderSlot::Night, now()).unwrap().len(), 1);
        assert!(db.list_due_reminders(ReminderSlot::Afternoon, now()).unwrap().is_empty());

        let expired = now() + Duration::days(3);
        assert!(db.list_due_reminders(ReminderSlot::Morning, expired).unwrap().is_empty());

        db.cancel_reminder(&reminder.reminder_id).unwrap();
        assert!(db.list_due_reminders(ReminderSlot::Morning, now()).unwrap().is_empty());
    }

    #[test]
    fn test_delete_prescription_cascades() {
        let (db, record) = setup_db();
        let reminder = make_reminder(&record, 7);
        db.insert_reminder(&reminder).unwrap();

        db.delete_prescription(&record.session_id).unwrap();
        assert!(db.get_reminder(&reminder.reminder_id).unwrap().is_none());
    }
}
