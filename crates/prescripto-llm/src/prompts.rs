//! Prompts for prescription extraction and patient-friendly simplification.

use std::fmt;

use prescripto_core::ExtractedData;

/// Instruction sent alongside the prescription image.
pub const EXTRACTION_PROMPT: &str = r#"You are a medical prescription parser.
Read this handwritten prescription image carefully and extract every visible
medicine and instruction.

Return ONLY this JSON object. No markdown, no explanation:
{
  "patientName": "",
  "doctorName": "",
  "date": "",
  "diagnosis": "",
  "medicines": [
    {
      "name": "",
      "type": "tablet | capsule | syrup | suspension | injection | drops | cream | ointment",
      "dosage": "",
      "frequency": "",
      "timing": "",
      "duration": "",
      "confidence": "high | medium | low"
    }
  ],
  "doctorNotes": "",
  "warnings": []
}

Confidence rules:
high   = clearly legible, you are certain
medium = partially legible, reasonable guess
low    = unclear, you are uncertain

Copy frequency and timing exactly as written (e.g. "1-0-1", "BD", "PC").

CRITICAL:
- Do NOT add or change any medical information
- Leave a field as an empty string if it is unreadable
- Return ONLY the JSON object"#;

/// Languages supported for patient instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Marathi,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Hindi => "hindi",
            Language::Marathi => "marathi",
        }
    }

    /// Case-insensitive; unknown languages are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Some(Language::English),
            "hindi" | "hi" => Some(Language::Hindi),
            "marathi" | "mr" => Some(Language::Marathi),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the patient-friendly rewrite request for a normalized record.
pub fn build_simplification_prompt(
    data: &ExtractedData,
    language: Language,
) -> Result<String, serde_json::Error> {
    let record = serde_json::to_string_pretty(data)?;

    Ok(format!(
        r#"You are a patient communication assistant.
Turn this prescription into simple instructions for the patient.
Target language: {language}

Prescription data:
{record}

Rules:
- Everyday words, no medical jargon
- Warm, reassuring tone
- One short paragraph per medicine
- Do NOT add or change any medical information
- Write the ENTIRE response in {language} only
- Finish with a brief general reminder about taking medicines safely"#
    ))
}
