//! Extraction models: the raw vision-model payload and its normalized form.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::medicine::Medicine;

/// A medicine entry exactly as the vision model returned it.
///
/// Every field is optional. Numbers and booleans are accepted where text is
/// expected (models often emit `"dosage": 500`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawMedicine {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub medicine_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dosage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timing: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub confidence: Option<String>,
}

/// A prescription extraction exactly as the vision model returned it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtraction {
    #[serde(default, deserialize_with = "lenient_string")]
    pub patient_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub doctor_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub diagnosis: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub doctor_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub warnings: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_medicines")]
    pub medicines: Option<Vec<RawMedicine>>,
}

impl RawExtraction {
    /// Parse an already-unwrapped JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// A normalized prescription extraction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub date: String,
    /// First sentence only when the model returned a long paragraph
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub doctor_notes: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Order matches the prescription; safety flag paths index into it
    #[serde(default)]
    pub medicines: Vec<Medicine>,
}

impl From<&Medicine> for RawMedicine {
    fn from(medicine: &Medicine) -> Self {
        Self {
            name: Some(medicine.name.clone()),
            medicine_type: Some(medicine.medicine_type.to_string()),
            dosage: Some(medicine.dosage.clone()),
            frequency: Some(medicine.frequency.clone()),
            duration: Some(medicine.duration.clone()),
            timing: Some(medicine.timing.clone()),
            confidence: Some(medicine.confidence.to_string()),
        }
    }
}

impl From<&ExtractedData> for RawExtraction {
    fn from(data: &ExtractedData) -> Self {
        Self {
            patient_name: Some(data.patient_name.clone()),
            doctor_name: Some(data.doctor_name.clone()),
            date: Some(data.date.clone()),
            diagnosis: Some(data.diagnosis.clone()),
            doctor_notes: Some(data.doctor_notes.clone()),
            warnings: Some(data.warnings.clone()),
            medicines: Some(data.medicines.iter().map(RawMedicine::from).collect()),
        }
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_string))
}

/// Accepts a list of scalars or a single scalar.
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(items.into_iter().filter_map(scalar_to_string).collect()),
        Some(other) => scalar_to_string(other).map(|s| vec![s]),
        None => None,
    })
}

/// Entries that are not objects become empty medicines so list positions
/// survive and the safety engine flags them.
fn lenient_medicines<'de, D>(deserializer: D) -> Result<Option<Vec<RawMedicine>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_extraction_all_fields_optional() {
        let raw = RawExtraction::from_json("{}").unwrap();
        assert_eq!(raw, RawExtraction::default());
    }

    #[test]
    fn test_raw_extraction_lenient_scalars() {
        let json = r#"{
            "patientName": "Ravi",
            "doctorName": null,
            "warnings": "Avoid alcohol",
            "medicines": [
                {"name": "Paracetamol", "dosage": 500, "frequency": "1-0-1", "confidence": "high"},
                "garbage",
                {"name": "Cough syrup", "type": "syrup", "dosage": 10.5}
            ]
        }"#;

        let raw = RawExtraction::from_json(json).unwrap();
        assert_eq!(raw.patient_name.as_deref(), Some("Ravi"));
        assert_eq!(raw.doctor_name, None);
        assert_eq!(raw.warnings, Some(vec!["Avoid alcohol".to_string()]));

        let medicines = raw.medicines.unwrap();
        assert_eq!(medicines.len(), 3);
        assert_eq!(medicines[0].dosage.as_deref(), Some("500"));
        assert_eq!(medicines[1], RawMedicine::default());
        assert_eq!(medicines[2].medicine_type.as_deref(), Some("syrup"));
        assert_eq!(medicines[2].dosage.as_deref(), Some("10.5"));
    }

    #[test]
    fn test_medicines_not_a_list() {
        let raw = RawExtraction::from_json(r#"{"medicines": "none"}"#).unwrap();
        assert!(raw.medicines.is_none());
    }

    #[test]
    fn test_extracted_data_camel_case() {
        let data = ExtractedData {
            patient_name: "Ravi".into(),
            doctor_notes: "Review in a week".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"patientName\":\"Ravi\""));
        assert!(json.contains("\"doctorNotes\""));
    }
}
