//! Extraction normalizer.
//!
//! Pipeline: raw model output → field defaulting → per-medicine frequency,
//! timing and dosage normalization → [`ExtractedData`]
//!
//! Every function here is total: malformed input is defaulted, never an error.

mod dosage;
mod frequency;

pub use dosage::*;
pub use frequency::*;

use crate::models::{Confidence, ExtractedData, Medicine, MedicineType, RawExtraction, RawMedicine};

/// Diagnoses longer than this are cut to their first sentence.
pub const MAX_DIAGNOSIS_CHARS: usize = 80;

/// Normalize a raw extraction into a canonical prescription record.
///
/// Medicine order is preserved.
pub fn post_process(raw: &RawExtraction) -> ExtractedData {
    let medicines: Vec<Medicine> = raw
        .medicines
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(normalize_medicine)
        .collect();

    tracing::debug!(medicines = medicines.len(), "post-processed extraction");

    ExtractedData {
        patient_name: text(&raw.patient_name),
        doctor_name: text(&raw.doctor_name),
        date: text(&raw.date),
        diagnosis: truncate_diagnosis(raw.diagnosis.as_deref().unwrap_or_default()),
        doctor_notes: text(&raw.doctor_notes),
        warnings: raw.warnings.clone().unwrap_or_default(),
        medicines,
    }
}

/// Normalize one medicine entry. Name and duration pass through untouched.
pub fn normalize_medicine(raw: &RawMedicine) -> Medicine {
    let medicine_type = MedicineType::parse(raw.medicine_type.as_deref().unwrap_or_default());
    let dosage = annotate_dosage(raw.dosage.as_deref().unwrap_or_default(), &medicine_type);

    Medicine {
        name: text(&raw.name),
        dosage,
        frequency: parse_frequency(raw.frequency.as_deref().unwrap_or_default()),
        timing: normalize_timing(raw.timing.as_deref().unwrap_or_default()),
        duration: text(&raw.duration),
        confidence: Confidence::parse(raw.confidence.as_deref()),
        medicine_type,
    }
}

/// Cut an over-long diagnosis at its first period.
pub fn truncate_diagnosis(diagnosis: &str) -> String {
    if diagnosis.chars().count() <= MAX_DIAGNOSIS_CHARS {
        return diagnosis.to_string();
    }

    match diagnosis.split_once('.') {
        Some((first, _)) => first.trim().to_string(),
        None => diagnosis.to_string(),
    }
}

fn text(field: &Option<String>) -> String {
    field.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_medicine(name: &str, medicine_type: Option<&str>, dosage: &str, frequency: &str) -> RawMedicine {
        RawMedicine {
            name: Some(name.into()),
            medicine_type: medicine_type.map(Into::into),
            dosage: Some(dosage.into()),
            frequency: Some(frequency.into()),
            duration: Some("5 days".into()),
            timing: Some("PC".into()),
            confidence: Some("high".into()),
        }
    }

    #[test]
    fn test_post_process_defaults() {
        let data = post_process(&RawExtraction::default());

        assert_eq!(data, ExtractedData::default());
        assert!(data.medicines.is_empty());
        assert!(data.warnings.is_empty());
    }

    #[test]
    fn test_normalize_medicine() {
        let medicine = normalize_medicine(&raw_medicine("Paracetamol", None, "500", "1-0-1"));

        assert_eq!(medicine.name, "Paracetamol");
        assert_eq!(medicine.medicine_type, MedicineType::Tablet);
        assert_eq!(medicine.dosage, "500mg");
        assert_eq!(medicine.frequency, "Morning and Night");
        assert_eq!(medicine.timing, "After food");
        assert_eq!(medicine.duration, "5 days");
        assert_eq!(medicine.confidence, Confidence::High);
    }

    #[test]
    fn test_missing_confidence_is_low() {
        let mut raw = raw_medicine("Cetirizine", Some("tab"), "10", "HS");
        raw.confidence = None;

        let medicine = normalize_medicine(&raw);
        assert_eq!(medicine.confidence, Confidence::Low);
        assert_eq!(medicine.frequency, "Night only (at bedtime)");
    }

    #[test]
    fn test_syrup_dosage_in_ml() {
        let medicine = normalize_medicine(&raw_medicine("Ambroxol", Some("Syrup"), "5", "TDS"));
        assert_eq!(medicine.dosage, "5ml");
        assert_eq!(medicine.medicine_type, MedicineType::Syrup);
    }

    #[test]
    fn test_medicine_order_preserved() {
        let raw = RawExtraction {
            medicines: Some(vec![
                raw_medicine("A", None, "1", "OD"),
                raw_medicine("B", None, "2", "BD"),
                raw_medicine("C", None, "3", "TDS"),
            ]),
            ..Default::default()
        };

        let names: Vec<String> = post_process(&raw).medicines.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_truncate_diagnosis() {
        assert_eq!(truncate_diagnosis("Viral fever."), "Viral fever.");

        let long = "Acute upper respiratory tract infection. Patient reports cough and mild fever for three days.";
        assert!(long.chars().count() > MAX_DIAGNOSIS_CHARS);
        assert_eq!(truncate_diagnosis(long), "Acute upper respiratory tract infection");

        let no_period = "a".repeat(100);
        assert_eq!(truncate_diagnosis(&no_period), no_period);
    }

    #[test]
    fn test_post_process_is_idempotent() {
        let raw = RawExtraction {
            patient_name: Some("Ravi".into()),
            diagnosis: Some("Hypertension".into()),
            warnings: Some(vec!["Avoid salt".into()]),
            medicines: Some(vec![
                raw_medicine("Amlodipine", None, "5", "OD"),
                raw_medicine("Syrup X", Some("syrup"), "10", "1 to 1 to 1"),
                raw_medicine("Cream Y", Some("cream"), "", "garbled"),
            ]),
            ..Default::default()
        };

        let once = post_process(&raw);
        let twice = post_process(&RawExtraction::from(&once));
        assert_eq!(once, twice);
    }
}
