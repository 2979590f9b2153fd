//! Prescripto Core Library
//!
//! Normalization and deterministic safety analysis for prescriptions read by
//! a vision model, with a human verification queue and SMS reminders.
//!
//! # Architecture
//!
//! ```text
//! Image → Vision model → raw JSON (untrusted)
//!                              │
//!                     Extraction post-processor
//!                     (frequency / timing / dosage)
//!                              │
//!                       Safety analysis engine
//!                              │
//!                 [STAGING: pending prescription]
//!                              │
//!                       Verification queue
//!                     (lowest safety score first)
//!                              │
//!                     Pharmacist edits/confirms
//!                              │
//!               ┌──────────────┼──────────────┐
//!               │              │              │
//!               ▼              ▼              ▼
//!            Summary       Reminders      Fingerprint
//!           (display)     (SMS slots)     (SHA-256)
//! ```
//!
//! # Core Principle
//!
//! **The safety score never trusts the model.** It is computed from the
//! normalized record alone and recomputed after every edit.
//!
//! # Modules
//!
//! - [`normalizer`]: Frequency, timing and dosage canonicalization
//! - [`safety`]: Rule-based safety engine
//! - [`models`]: Domain types (Medicine, SafetyAnalysis, PrescriptionRecord, Reminder)
//! - [`db`]: SQLite persistence for prescriptions and reminders
//! - [`export`]: Display summary and reminder SMS dispatch

pub mod db;
pub mod export;
pub mod models;
pub mod normalizer;
pub mod safety;

// Re-export commonly used types
pub use db::{Database, DbError};
pub use export::{build_summary, dispatch_slot, DispatchReport, SmsSender, Summary};
pub use models::{
    ExtractedData, Medicine, PrescriptionRecord, PrescriptionStatus, RawExtraction, Reminder,
    ReminderSlot, ReminderSlots, SafetyAnalysis,
};
pub use normalizer::post_process;
pub use safety::{analyze_safety, analyze_safety_with, SafetyPolicy};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use export::{send_confirmation, SmsError};
use models::{RawMedicine, RecordError, SafetyFlag};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PrescriptoError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<db::DbError> for PrescriptoError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(id) => PrescriptoError::NotFound(id),
            e @ db::DbError::VersionConflict { .. } => {
                PrescriptoError::VersionConflict(e.to_string())
            }
            e => PrescriptoError::DatabaseError(e.to_string()),
        }
    }
}

impl From<RecordError> for PrescriptoError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::InvalidTransition { .. } => PrescriptoError::InvalidState(e.to_string()),
            RecordError::InvalidPhoneNumber(_) | RecordError::InvalidDuration(_) => {
                PrescriptoError::InvalidInput(e.to_string())
            }
            RecordError::Json(e) => PrescriptoError::SerializationError(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for PrescriptoError {
    fn from(e: serde_json::Error) -> Self {
        PrescriptoError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PrescriptoError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PrescriptoError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for PrescriptoError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        PrescriptoError::InvalidState(format!("SMS gateway callback failed: {}", e.reason))
    }
}

// =========================================================================
// SMS Gateway (implemented by the host app)
// =========================================================================

/// Host-side SMS provider. Returns the provider's message ID.
#[uniffi::export(callback_interface)]
pub trait SmsGateway: Send + Sync {
    fn send(&self, to: String, body: String) -> Result<String, PrescriptoError>;
}

struct GatewaySender<'a>(&'a dyn SmsGateway);

impl SmsSender for GatewaySender<'_> {
    fn send(&self, to: &str, body: &str) -> Result<String, SmsError> {
        self.0
            .send(to.to_string(), body.to_string())
            .map_err(|e| SmsError::Unavailable(e.to_string()))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<PrescriptoCore>, PrescriptoError> {
    let db = Database::open(&path)?;
    Ok(PrescriptoCore::new(db, SafetyPolicy::default()))
}

/// Open a database and score with a policy given as JSON.
///
/// Missing policy fields keep their defaults.
#[uniffi::export]
pub fn open_database_with_policy(
    path: String,
    policy_json: String,
) -> Result<Arc<PrescriptoCore>, PrescriptoError> {
    let policy: SafetyPolicy = serde_json::from_str(&policy_json)
        .map_err(|e| PrescriptoError::InvalidInput(format!("policy: {}", e)))?;
    let db = Database::open(&path)?;
    Ok(PrescriptoCore::new(db, policy))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<PrescriptoCore>, PrescriptoError> {
    let db = Database::open_in_memory()?;
    Ok(PrescriptoCore::new(db, SafetyPolicy::default()))
}

// =========================================================================
// Stateless Helpers (exported to FFI)
// =========================================================================

/// Canonical schedule label for a raw frequency.
#[uniffi::export]
pub fn parse_frequency(raw: String) -> String {
    normalizer::parse_frequency(&raw)
}

/// Expand a timing abbreviation.
#[uniffi::export]
pub fn normalize_timing(raw: String) -> String {
    normalizer::normalize_timing(&raw)
}

/// Append a unit to a bare numeric dosage.
#[uniffi::export]
pub fn normalize_dosage(dosage: String, medicine_type: String) -> String {
    normalizer::normalize_dosage(&dosage, &medicine_type)
}

/// Check an E.164 phone number.
#[uniffi::export]
pub fn validate_phone_number(phone_number: String) -> bool {
    models::validate_phone_number(&phone_number)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct PrescriptoCore {
    db: Arc<Mutex<Database>>,
    policy: SafetyPolicy,
}

impl PrescriptoCore {
    fn new(db: Database, policy: SafetyPolicy) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            policy,
        })
    }

    /// Load, mutate and save a record under optimistic versioning.
    fn modify(
        &self,
        session_id: &str,
        expected_version: u32,
        change: impl FnOnce(&mut PrescriptionRecord) -> Result<(), RecordError>,
    ) -> Result<FfiPrescription, PrescriptoError> {
        let db = self.db.lock()?;
        let mut record = db
            .get_prescription(session_id)?
            .ok_or_else(|| PrescriptoError::NotFound(session_id.to_string()))?;

        change(&mut record)?;
        db.update_prescription(&record, expected_version)?;
        Ok(record.into())
    }
}

#[uniffi::export]
impl PrescriptoCore {
    // =========================================================================
    // Prescription Operations
    // =========================================================================

    /// Normalize, score and store a model response (already unwrapped JSON).
    pub fn ingest_extraction(
        &self,
        raw_text: String,
        extraction_json: String,
    ) -> Result<FfiPrescription, PrescriptoError> {
        let raw = RawExtraction::from_json(&extraction_json)
            .map_err(|e| PrescriptoError::InvalidInput(e.to_string()))?;
        let record = PrescriptionRecord::from_extraction(raw_text, &raw, &self.policy);

        let db = self.db.lock()?;
        db.insert_prescription(&record)?;
        Ok(record.into())
    }

    /// Get a prescription by session ID.
    pub fn get_prescription(
        &self,
        session_id: String,
    ) -> Result<Option<FfiPrescription>, PrescriptoError> {
        let db = self.db.lock()?;
        let record = db.get_prescription(&session_id)?;
        Ok(record.map(|r| r.into()))
    }

    /// Replace the medicine list with human edits. The record is rescored.
    pub fn update_medicines(
        &self,
        session_id: String,
        medicines: Vec<FfiMedicine>,
        expected_version: u32,
    ) -> Result<FfiPrescription, PrescriptoError> {
        let edits: Vec<RawMedicine> = medicines.into_iter().map(|m| m.into()).collect();
        self.modify(&session_id, expected_version, |record| {
            record.apply_edits(&edits, &self.policy)
        })
    }

    /// Confirm a pending prescription.
    pub fn confirm_prescription(
        &self,
        session_id: String,
        verified_by: String,
        expected_version: u32,
    ) -> Result<FfiPrescription, PrescriptoError> {
        self.modify(&session_id, expected_version, |record| record.confirm(verified_by))
    }

    /// Reject a pending prescription.
    pub fn reject_prescription(
        &self,
        session_id: String,
        expected_version: u32,
    ) -> Result<FfiPrescription, PrescriptoError> {
        self.modify(&session_id, expected_version, |record| record.reject())
    }

    /// Get prescriptions awaiting verification (lowest safety score first).
    pub fn list_pending_review(&self) -> Result<Vec<FfiPrescription>, PrescriptoError> {
        let db = self.db.lock()?;
        let records = db.list_pending_review()?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Display summary as JSON.
    pub fn summary_json(&self, session_id: String) -> Result<String, PrescriptoError> {
        let db = self.db.lock()?;
        let record = db
            .get_prescription(&session_id)?
            .ok_or(PrescriptoError::NotFound(session_id))?;
        let summary = build_summary(&record.extracted_data, &record.safety_analysis);
        Ok(summary.to_json()?)
    }

    // =========================================================================
    // Reminder Operations
    // =========================================================================

    /// Schedule SMS reminders for a prescription and text the patient a
    /// confirmation through `gateway`.
    ///
    /// The reminder is kept even when the confirmation fails; the receipt
    /// carries the delivery status.
    pub fn set_reminder(
        &self,
        session_id: String,
        phone_number: String,
        slots: Option<FfiReminderSlots>,
        duration_days: Option<u32>,
        gateway: Box<dyn SmsGateway>,
    ) -> Result<FfiReminderReceipt, PrescriptoError> {
        let reminder = {
            let db = self.db.lock()?;
            let record = db
                .get_prescription(&session_id)?
                .ok_or(PrescriptoError::NotFound(session_id))?;

            let reminder = Reminder::for_prescription(
                &record,
                &phone_number,
                slots.map(|s| s.into()),
                duration_days,
                chrono::Utc::now(),
            )?;
            db.insert_reminder(&reminder)?;
            reminder
        };

        let outcome = send_confirmation(&GatewaySender(gateway.as_ref()), &reminder);
        Ok(FfiReminderReceipt {
            reminder: reminder.into(),
            sms_status: outcome.sms_status.as_str().to_string(),
            message_id: outcome.message_id,
            sms_error: outcome.sms_error,
        })
    }

    /// Active reminders for a prescription.
    pub fn list_reminders(&self, session_id: String) -> Result<Vec<FfiReminder>, PrescriptoError> {
        let db = self.db.lock()?;
        let reminders = db.list_active_reminders_for_session(&session_id)?;
        Ok(reminders.into_iter().map(|r| r.into()).collect())
    }

    /// Stop a reminder. Returns false if it does not exist.
    pub fn cancel_reminder(&self, reminder_id: String) -> Result<bool, PrescriptoError> {
        let db = self.db.lock()?;
        Ok(db.cancel_reminder(&reminder_id)?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub name: String,
    pub medicine_type: String,
    pub dosage: String,
    pub frequency: String,
    pub timing: String,
    pub duration: String,
    pub confidence: String,
}

impl From<Medicine> for FfiMedicine {
    fn from(medicine: Medicine) -> Self {
        Self {
            name: medicine.name,
            medicine_type: medicine.medicine_type.to_string(),
            dosage: medicine.dosage,
            frequency: medicine.frequency,
            timing: medicine.timing,
            duration: medicine.duration,
            confidence: medicine.confidence.to_string(),
        }
    }
}

impl From<FfiMedicine> for RawMedicine {
    fn from(medicine: FfiMedicine) -> Self {
        RawMedicine {
            name: Some(medicine.name),
            medicine_type: Some(medicine.medicine_type),
            dosage: Some(medicine.dosage),
            frequency: Some(medicine.frequency),
            timing: Some(medicine.timing),
            duration: Some(medicine.duration),
            confidence: Some(medicine.confidence),
        }
    }
}

/// FFI-safe safety flag.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSafetyFlag {
    pub field: String,
    pub rule: String,
    pub severity: String,
    pub message: String,
}

impl From<SafetyFlag> for FfiSafetyFlag {
    fn from(flag: SafetyFlag) -> Self {
        Self {
            field: flag.field,
            rule: flag.rule.to_string(),
            severity: flag.severity.as_str().to_string(),
            message: flag.message,
        }
    }
}

/// FFI-safe safety analysis.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSafetyAnalysis {
    pub safety_score: u32,
    pub overall_risk: String,
    pub flags: Vec<FfiSafetyFlag>,
}

impl From<SafetyAnalysis> for FfiSafetyAnalysis {
    fn from(analysis: SafetyAnalysis) -> Self {
        Self {
            safety_score: analysis.safety_score,
            overall_risk: analysis.overall_risk.to_string(),
            flags: analysis.flags.into_iter().map(|f| f.into()).collect(),
        }
    }
}

/// FFI-safe prescription record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescription {
    pub session_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: String,
    pub diagnosis: String,
    pub doctor_notes: String,
    pub warnings: Vec<String>,
    pub medicines: Vec<FfiMedicine>,
    pub safety: FfiSafetyAnalysis,
    pub status: String,
    pub version: u32,
    pub verified_by: Option<String>,
    pub content_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PrescriptionRecord> for FfiPrescription {
    fn from(record: PrescriptionRecord) -> Self {
        let data = record.extracted_data;
        Self {
            session_id: record.session_id,
            patient_name: data.patient_name,
            doctor_name: data.doctor_name,
            date: data.date,
            diagnosis: data.diagnosis,
            doctor_notes: data.doctor_notes,
            warnings: data.warnings,
            medicines: data.medicines.into_iter().map(|m| m.into()).collect(),
            safety: record.safety_analysis.into(),
            status: record.status.to_string(),
            version: record.version,
            verified_by: record.verified_by,
            content_hash: record.content_hash,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// FFI-safe reminder slot selection.
#[derive(Debug, Clone, Copy, uniffi::Record)]
pub struct FfiReminderSlots {
    pub morning: bool,
    pub afternoon: bool,
    pub night: bool,
}

impl From<FfiReminderSlots> for ReminderSlots {
    fn from(slots: FfiReminderSlots) -> Self {
        ReminderSlots {
            morning: slots.morning,
            afternoon: slots.afternoon,
            night: slots.night,
        }
    }
}

impl From<ReminderSlots> for FfiReminderSlots {
    fn from(slots: ReminderSlots) -> Self {
        Self {
            morning: slots.morning,
            afternoon: slots.afternoon,
            night: slots.night,
        }
    }
}

/// FFI-safe reminder.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReminder {
    pub reminder_id: String,
    pub session_id: String,
    pub phone_number: String,
    pub medicine_names: Vec<String>,
    pub slots: FfiReminderSlots,
    pub is_active: bool,
    pub start_date: String,
    pub end_date: String,
}

/// A newly scheduled reminder with its confirmation SMS status.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReminderReceipt {
    pub reminder: FfiReminder,
    /// "sent" or "failed"
    pub sms_status: String,
    pub message_id: Option<String>,
    pub sms_error: Option<String>,
}

impl From<Reminder> for FfiReminder {
    fn from(reminder: Reminder) -> Self {
        Self {
            reminder_id: reminder.reminder_id,
            session_id: reminder.session_id,
            phone_number: reminder.phone_number,
            medicine_names: reminder.medicines.into_iter().map(|m| m.name).collect(),
            slots: reminder.slots.into(),
            is_active: reminder.is_active,
            start_date: reminder.start_date,
            end_date: reminder.end_date,
        }
    }
}
