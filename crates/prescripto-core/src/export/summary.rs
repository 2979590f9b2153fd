//! Display-ready prescription summary.
//!
//! Read-side projection only: nothing here normalizes or scores.

use serde::{Deserialize, Serialize};

use crate::models::{Confidence, ExtractedData, Medicine, OverallRisk, SafetyAnalysis};

/// Full summary for print/report rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub header: SummaryHeader,
    pub safety: SafetySummary,
    pub medicines: Vec<MedicineSummary>,
    pub warnings: Vec<String>,
    pub doctor_notes: String,
}

/// Patient/doctor header block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryHeader {
    pub patient_name: String,
    pub doctor_name: String,
    pub date: String,
    pub diagnosis: String,
}

/// Safety block: score, risk glyph and flag counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySummary {
    pub score: u32,
    pub overall_risk: OverallRisk,
    pub glyph: String,
    /// e.g. "🟢 100/100"
    pub display: String,
    pub critical_count: usize,
    pub warning_count: usize,
}

/// One flattened medicine row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineSummary {
    /// Position in the prescription (0-based, matches flag paths)
    pub index: usize,
    /// "name (type)"
    pub display: String,
    /// "dosage | frequency"
    pub dose: String,
    pub timing: String,
    pub duration: String,
    pub confidence: Confidence,
}

impl Summary {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Glyph shown next to a risk tier.
pub fn risk_glyph(risk: OverallRisk) -> &'static str {
    match risk {
        OverallRisk::Low => "🟢",
        OverallRisk::Medium => "🟡",
        OverallRisk::High => "🔴",
    }
}

/// Project a normalized record and its analysis into a summary.
pub fn build_summary(data: &ExtractedData, analysis: &SafetyAnalysis) -> Summary {
    let glyph = risk_glyph(analysis.overall_risk);

    Summary {
        header: SummaryHeader {
            patient_name: data.patient_name.clone(),
            doctor_name: data.doctor_name.clone(),
            date: data.date.clone(),
            diagnosis: data.diagnosis.clone(),
        },
        safety: SafetySummary {
            score: analysis.safety_score,
            overall_risk: analysis.overall_risk,
            glyph: glyph.to_string(),
            display: format!("{} {}/100", glyph, analysis.safety_score),
            critical_count: analysis.critical_count(),
            warning_count: analysis.warning_count(),
        },
        medicines: data
            .medicines
            .iter()
            .enumerate()
            .map(|(index, medicine)| medicine_row(index, medicine))
            .collect(),
        warnings: data.warnings.clone(),
        doctor_notes: data.doctor_notes.clone(),
    }
}

fn medicine_row(index: usize, medicine: &Medicine) -> MedicineSummary {
    let name = match medicine.name.trim() {
        "" => "Unknown",
        name => name,
    };

    let dose = [medicine.dosage.trim(), medicine.frequency.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

    MedicineSummary {
        index,
        display: format!("{} ({})", name, medicine.medicine_type),
        dose,
        timing: medicine.timing.clone(),
        duration: medicine.duration.clone(),
        confidence: medicine.confidence,
    }
}
