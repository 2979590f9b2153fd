//! Parsing vision-model output into a raw extraction.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use prescripto_core::RawExtraction;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Markdown code fences, with or without a `json` tag.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?").expect("valid fence regex"));

/// Strip markdown fences and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Parse a model response into a raw extraction.
///
/// Accepts a bare object, a fenced object, or an object wrapped in prose.
pub fn parse_extraction_response(raw: &str) -> ExtractionResult<RawExtraction> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    // Try to find JSON in the response (in case the model adds extra text)
    let json_start = cleaned.find('{').ok_or_else(|| {
        ExtractionError::InvalidFormat("No JSON object found in response".into())
    })?;
    let json_end = cleaned.rfind('}').ok_or_else(|| {
        ExtractionError::InvalidFormat("No closing brace found in response".into())
    })?;
    if json_end < json_start {
        return Err(ExtractionError::InvalidFormat(
            "Closing brace precedes opening brace".into(),
        ));
    }

    if json_start > 0 || json_end + 1 < cleaned.len() {
        tracing::debug!(
            leading = json_start,
            trailing = cleaned.len() - json_end - 1,
            "discarding text around JSON object"
        );
    }

    let extraction = RawExtraction::from_json(&cleaned[json_start..=json_end])?;
    Ok(extraction)
}

/// Check a simplification response and return it trimmed.
pub fn validate_simplified_text(text: &str) -> ExtractionResult<String> {
    match text.trim() {
        "" => Err(ExtractionError::EmptyResponse),
        trimmed => Ok(trimmed.to_string()),
    }
}
