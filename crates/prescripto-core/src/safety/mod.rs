//! Deterministic safety engine.
//!
//! Rules run in a fixed order over a normalized extraction:
//!
//! | rule | severity | scope |
//! |---|---|---|
//! | `EMPTY_EXTRACTION` | critical | record |
//! | `MISSING_NAME` | critical | medicine |
//! | `MISSING_DOSAGE` | critical | medicine |
//! | `LOW_CONFIDENCE` | warning | medicine |
//! | `SUSPICIOUS_DOSAGE` | warning | medicine |
//!
//! Score = 100 - 30 × critical - 10 × warning, clamped to 0..=100. This is
//! independent of the model's own confidence and never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{
    Confidence, ExtractedData, Medicine, OverallRisk, SafetyAnalysis, SafetyFlag, SafetyRule,
    Severity,
};

/// Adjustable scoring constants. Defaults match the audited policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyPolicy {
    /// Points lost per critical flag
    pub critical_penalty: u32,
    /// Points lost per warning flag
    pub warning_penalty: u32,
    /// Dosages above this are suspicious
    pub max_plausible_dosage: f64,
    /// Dosages below this are suspicious
    pub min_plausible_dosage: f64,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            critical_penalty: 30,
            warning_penalty: 10,
            max_plausible_dosage: 2000.0,
            min_plausible_dosage: 0.0,
        }
    }
}

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:Infinity|(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("valid number regex")
});

/// Analyze an extraction with the default policy.
pub fn analyze_safety(data: &ExtractedData) -> SafetyAnalysis {
    analyze_safety_with(data, &SafetyPolicy::default())
}

/// Analyze an extraction with an explicit policy.
pub fn analyze_safety_with(data: &ExtractedData, policy: &SafetyPolicy) -> SafetyAnalysis {
    let empty = data.medicines.is_empty().then(|| {
        SafetyFlag::new(
            "medicines",
            SafetyRule::EmptyExtraction,
            "No medicines could be extracted from image",
        )
    });

    let flags: Vec<SafetyFlag> = empty
        .into_iter()
        .chain(
            data.medicines
                .iter()
                .enumerate()
                .flat_map(|(index, medicine)| medicine_flags(index, medicine, policy)),
        )
        .collect();

    let safety_score = score(&flags, policy);

    SafetyAnalysis {
        safety_score,
        overall_risk: OverallRisk::from_score(safety_score),
        flags,
    }
}

/// Parse the leading number of a dosage string ("5000mg" → 5000).
///
/// "Infinity" and out-of-range exponents read as infinite, so they always
/// count as implausible.
pub fn leading_number(dosage: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(dosage)
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
}

fn medicine_flags(index: usize, medicine: &Medicine, policy: &SafetyPolicy) -> Vec<SafetyFlag> {
    let label = display_name(medicine);

    let missing_name = medicine.name.trim().is_empty().then(|| {
        SafetyFlag::new(
            format!("medicines[{}].name", index),
            SafetyRule::MissingName,
            format!("Medicine at position {} has no name", index + 1),
        )
    });

    let missing_dosage = medicine.dosage.trim().is_empty().then(|| {
        SafetyFlag::new(
            format!("medicines[{}].dosage", index),
            SafetyRule::MissingDosage,
            format!("Medicine \"{}\" has no dosage", label),
        )
    });

    let low_confidence = (medicine.confidence == Confidence::Low).then(|| {
        SafetyFlag::new(
            format!("medicines[{}]", index),
            SafetyRule::LowConfidence,
            format!("Medicine \"{}\" has low OCR confidence", label),
        )
    });

    let suspicious_dosage = leading_number(&medicine.dosage)
        .filter(|value| *value > policy.max_plausible_dosage || *value < policy.min_plausible_dosage)
        .map(|_| {
            SafetyFlag::new(
                format!("medicines[{}].dosage", index),
                SafetyRule::SuspiciousDosage,
                format!("Medicine \"{}\" has unusual dosage: {}", label, medicine.dosage),
            )
        });

    [missing_name, missing_dosage, low_confidence, suspicious_dosage]
        .into_iter()
        .flatten()
        .collect()
}

fn display_name(medicine: &Medicine) -> &str {
    let name = medicine.name.trim();
    if name.is_empty() {
        "unknown"
    } else {
        name
    }
}

fn score(flags: &[SafetyFlag], policy: &SafetyPolicy) -> u32 {
    let penalty = flags.iter().fold(0u32, |total, flag| {
        let cost = match flag.severity {
            Severity::Critical => policy.critical_penalty,
            Severity::Warning => policy.warning_penalty,
        };
        total.saturating_add(cost)
    });

    100u32.saturating_sub(penalty).min(100)
}
