//! Prescription record and its verification lifecycle.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::extraction::{ExtractedData, RawExtraction, RawMedicine};
use super::safety::SafetyAnalysis;
use crate::normalizer::{normalize_medicine, post_process};
use crate::safety::{analyze_safety_with, SafetyPolicy};

/// Record lifecycle errors.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Cannot {action} a {status} prescription")]
    InvalidTransition {
        action: &'static str,
        status: PrescriptionStatus,
    },

    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("Reminder duration out of range: {0} days")]
    InvalidDuration(u32),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// Verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    /// Awaiting human verification
    Pending,
    /// Verified by a qualified person
    Confirmed,
    /// Rejected during verification
    Rejected,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Pending => "pending",
            PrescriptionStatus::Confirmed => "confirmed",
            PrescriptionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PrescriptionStatus::Pending),
            "confirmed" => Some(PrescriptionStatus::Confirmed),
            "rejected" => Some(PrescriptionStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized prescription with its current safety analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRecord {
    /// Unique session ID
    pub session_id: String,
    /// Raw model response, kept for audit
    pub raw_text: String,
    pub extracted_data: ExtractedData,
    /// Always computed from the current medicines
    pub safety_analysis: SafetyAnalysis,
    pub status: PrescriptionStatus,
    /// Bumped on every change; used for optimistic concurrency
    pub version: u32,
    /// Who confirmed the record
    pub verified_by: Option<String>,
    /// SHA-256 of the extracted data at confirmation
    pub content_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub confirmed_at: Option<String>,
}

/// Current time in the format stored by the database layer.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl PrescriptionRecord {
    /// Normalize and score a fresh extraction.
    pub fn from_extraction(raw_text: String, raw: &RawExtraction, policy: &SafetyPolicy) -> Self {
        let extracted_data = post_process(raw);
        let safety_analysis = analyze_safety_with(&extracted_data, policy);
        let now = timestamp_now();

        tracing::info!(
            medicines = extracted_data.medicines.len(),
            safety_score = safety_analysis.safety_score,
            risk = %safety_analysis.overall_risk,
            "new prescription record"
        );

        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            raw_text,
            extracted_data,
            safety_analysis,
            status: PrescriptionStatus::Pending,
            version: 1,
            verified_by: None,
            content_hash: None,
            created_at: now.clone(),
            updated_at: now,
            confirmed_at: None,
        }
    }

    /// Replace the medicine list with human edits and rescore.
    pub fn apply_edits(
        &mut self,
        medicines: &[RawMedicine],
        policy: &SafetyPolicy,
    ) -> RecordResult<()> {
        self.require_pending("edit")?;

        self.extracted_data.medicines = medicines.iter().map(normalize_medicine).collect();
        self.safety_analysis = analyze_safety_with(&self.extracted_data, policy);
        self.bump();
        Ok(())
    }

    /// Mark as verified and fingerprint the content.
    pub fn confirm(&mut self, verified_by: impl Into<String>) -> RecordResult<()> {
        self.require_pending("confirm")?;

        self.content_hash = Some(self.fingerprint()?);
        self.verified_by = Some(verified_by.into());
        self.status = PrescriptionStatus::Confirmed;
        self.bump();
        self.confirmed_at = Some(self.updated_at.clone());
        Ok(())
    }

    pub fn reject(&mut self) -> RecordResult<()> {
        self.require_pending("reject")?;

        self.status = PrescriptionStatus::Rejected;
        self.bump();
        Ok(())
    }

    /// SHA-256 (hex) of the canonical JSON of the extracted data.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let payload = serde_json::to_string(&self.extracted_data)?;
        Ok(hex::encode(Sha256::digest(payload.as_bytes())))
    }

    /// Whether the content still matches the fingerprint taken at confirmation.
    pub fn verify_integrity(&self) -> bool {
        match (&self.content_hash, self.fingerprint()) {
            (Some(stored), Ok(current)) => *stored == current,
            _ => false,
        }
    }

    fn require_pending(&self, action: &'static str) -> RecordResult<()> {
        if self.status != PrescriptionStatus::Pending {
            return Err(RecordError::InvalidTransition {
                action,
                status: self.status,
            });
        }
        Ok(())
    }

    fn bump(&mut self) {
        self.version += 1;
        self.updated_at = timestamp_now();
    }
}
