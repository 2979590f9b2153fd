//! Timing and dosage normalization.

use crate::models::MedicineType;

/// Timing abbreviations. Keys are lowercase with periods removed.
const TIMINGS: &[(&str, &str)] = &[
    ("ac", "Before food"),
    ("pc", "After food"),
    ("cc", "With food"),
    ("hs", "At bedtime"),
];

/// Expand a timing abbreviation (AC, PC, CC, HS).
///
/// Unrecognized input is returned unchanged.
pub fn normalize_timing(raw: &str) -> String {
    let key = raw.trim().replace('.', "").to_lowercase();
    match TIMINGS.iter().find(|(abbr, _)| *abbr == key) {
        Some((_, phrase)) => phrase.to_string(),
        None => {
            if !key.is_empty() {
                tracing::debug!(raw, "timing passed through unchanged");
            }
            raw.to_string()
        }
    }
}

/// Append a unit to a bare numeric dosage, chosen by dosage form.
///
/// A dosage that already contains a letter is assumed to carry its unit and
/// is returned unchanged. Empty input stays empty.
pub fn normalize_dosage(dosage: &str, medicine_type: &str) -> String {
    annotate_dosage(dosage, &MedicineType::parse(medicine_type))
}

pub(crate) fn annotate_dosage(dosage: &str, medicine_type: &MedicineType) -> String {
    if dosage.chars().any(char::is_alphabetic) {
        return dosage.to_string();
    }

    let trimmed = dosage.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    format!("{}{}", trimmed, medicine_type.dosage_unit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_abbreviations() {
        assert_eq!(normalize_timing("AC"), "Before food");
        assert_eq!(normalize_timing("p.c."), "After food");
        assert_eq!(normalize_timing(" cc "), "With food");
        assert_eq!(normalize_timing("HS"), "At bedtime");
    }

    #[test]
    fn test_timing_passthrough() {
        assert_eq!(normalize_timing("Before food"), "Before food");
        assert_eq!(normalize_timing("empty stomach"), "empty stomach");
        assert_eq!(normalize_timing(""), "");
    }

    #[test]
    fn test_dosage_units_by_type() {
        assert_eq!(normalize_dosage("500", "tablet"), "500mg");
        assert_eq!(normalize_dosage("250", "cap"), "250mg");
        assert_eq!(normalize_dosage("10", "syrup"), "10ml");
        assert_eq!(normalize_dosage(" 5 ", "susp"), "5ml");
        assert_eq!(normalize_dosage("15", "ointment"), "15gm");
        assert_eq!(normalize_dosage("2", "oin"), "2gm");
        assert_eq!(normalize_dosage("40", "injection"), "40mg");
        assert_eq!(normalize_dosage("40", ""), "40mg");
    }

    #[test]
    fn test_dosage_with_unit_untouched() {
        assert_eq!(normalize_dosage("500mg", "tablet"), "500mg");
        assert_eq!(normalize_dosage("5 ml", "tablet"), "5 ml");
        assert_eq!(normalize_dosage("two tablets", "syrup"), "two tablets");
    }

    #[test]
    fn test_empty_dosage() {
        assert_eq!(normalize_dosage("", "tablet"), "");
        assert_eq!(normalize_dosage("   ", "syrup"), "");
    }
}
