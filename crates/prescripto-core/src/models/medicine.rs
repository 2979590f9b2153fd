//! Medicine models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dosage form of a medicine.
///
/// Open enum: forms outside the known set are kept verbatim (lowercased) in
/// [`MedicineType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MedicineType {
    #[default]
    Tablet,
    Capsule,
    Syrup,
    Suspension,
    Injection,
    Drops,
    Cream,
    Ointment,
    Other(String),
}

impl MedicineType {
    /// Parse a free-text dosage form. Empty input defaults to tablet.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "" | "tablet" | "tab" => MedicineType::Tablet,
            "capsule" | "cap" => MedicineType::Capsule,
            "syrup" => MedicineType::Syrup,
            "suspension" | "susp" => MedicineType::Suspension,
            "injection" => MedicineType::Injection,
            "drops" => MedicineType::Drops,
            "cream" => MedicineType::Cream,
            "ointment" | "oin" => MedicineType::Ointment,
            _ => MedicineType::Other(lower),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MedicineType::Tablet => "tablet",
            MedicineType::Capsule => "capsule",
            MedicineType::Syrup => "syrup",
            MedicineType::Suspension => "suspension",
            MedicineType::Injection => "injection",
            MedicineType::Drops => "drops",
            MedicineType::Cream => "cream",
            MedicineType::Ointment => "ointment",
            MedicineType::Other(other) => other,
        }
    }

    /// Unit appended to a bare numeric dosage of this form.
    pub fn dosage_unit(&self) -> &'static str {
        match self {
            MedicineType::Syrup | MedicineType::Suspension => "ml",
            MedicineType::Tablet | MedicineType::Capsule => "mg",
            MedicineType::Cream | MedicineType::Ointment => "gm",
            _ => "mg",
        }
    }
}

impl From<String> for MedicineType {
    fn from(raw: String) -> Self {
        MedicineType::parse(&raw)
    }
}

impl From<MedicineType> for String {
    fn from(medicine_type: MedicineType) -> Self {
        medicine_type.as_str().to_string()
    }
}

impl fmt::Display for MedicineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction certainty reported by the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    /// Absence of a signal is not treated as certainty.
    #[default]
    Low,
}

impl Confidence {
    /// Parse leniently; anything unrecognized is `Low`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_lowercase()).as_deref() {
            Some("high") => Confidence::High,
            Some("medium") => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized medicine entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Medicine {
    /// Medicine name as read from the prescription
    #[serde(default)]
    pub name: String,
    /// Dosage form
    #[serde(rename = "type", default)]
    pub medicine_type: MedicineType,
    /// Unit-annotated dosage (e.g., "500mg", "10ml")
    #[serde(default)]
    pub dosage: String,
    /// Canonical schedule label (e.g., "Morning and Night")
    #[serde(default)]
    pub frequency: String,
    /// Canonical timing phrase (e.g., "After food")
    #[serde(default)]
    pub timing: String,
    /// Free-text duration, passed through
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub confidence: Confidence,
}
