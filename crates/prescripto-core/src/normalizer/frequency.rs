//! Frequency shorthand parser.
//!
//! Handwritten prescriptions mix several conventions for the same schedule:
//! letter abbreviations (BD, TDS), dash-separated slot codes (1-0-1) and
//! prose ("twice a day"). Rules are tried in order, first match wins:
//!
//! 1. Canonical labels (re-parsing parser output is stable)
//! 2. Exact abbreviations and phrases
//! 3. Three-token slot notation (`1-0-1`, `1/0/1`, `1 to 0 to 1`)
//! 4. Three-character binary strings (`101`)
//! 5. Fuzzy phrases ("3 times a day", "at bedtime")
//! 6. "As directed"
//!
//! Unrecognized input is never echoed back.

use std::sync::LazyLock;

use regex::Regex;

pub const MORNING: &str = "Morning";
pub const MORNING_AND_NIGHT: &str = "Morning and Night";
pub const THREE_TIMES_DAILY: &str = "Morning, Afternoon and Night";
pub const FOUR_TIMES_DAILY: &str = "Morning, Afternoon, Evening and Night";
pub const AS_NEEDED: &str = "Take whenever needed";
pub const AT_BEDTIME: &str = "Night only (at bedtime)";
pub const IMMEDIATELY: &str = "Immediately (one time)";
pub const NIGHT_ONLY: &str = "Night only";
pub const MORNING_ONLY: &str = "Morning only";
pub const AS_DIRECTED: &str = "As directed";

/// Slot names for positional notation: (morning, afternoon, night).
const SLOT_NAMES: [&str; 3] = ["Morning", "Afternoon", "Night"];

/// Exact-match dictionary. Keys are lowercase with periods removed.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("od", MORNING),
    ("qd", MORNING),
    ("bd", MORNING_AND_NIGHT),
    ("bid", MORNING_AND_NIGHT),
    ("tds", THREE_TIMES_DAILY),
    ("tid", THREE_TIMES_DAILY),
    ("qid", FOUR_TIMES_DAILY),
    ("sos", AS_NEEDED),
    ("prn", AS_NEEDED),
    ("hs", AT_BEDTIME),
    ("stat", IMMEDIATELY),
    ("nocte", NIGHT_ONLY),
    ("mane", MORNING_ONLY),
    ("once daily", MORNING),
    ("twice daily", MORNING_AND_NIGHT),
    ("thrice daily", THREE_TIMES_DAILY),
];

type FrequencyRule = fn(&str) -> Option<String>;

/// Ordered cascade. Adding a convention means inserting one entry at the
/// priority it should have.
const RULES: &[(&str, FrequencyRule)] = &[
    ("canonical", canonical_label),
    ("abbreviation", abbreviation),
    ("slot_tokens", slot_tokens),
    ("binary_string", binary_string),
    ("fuzzy_phrase", fuzzy_phrase),
];

static TOKEN_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[-\s/.]|to)+").expect("valid separator regex"));

static FUZZY_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"as needed|whenever|required|\bsos\b|\bprn\b", AS_NEEDED),
        (r"\bfour\b|\b4\s*times\b", FOUR_TIMES_DAILY),
        (r"\bthrice\b|\b3\s*times\b|\btds\b|\btid\b", THREE_TIMES_DAILY),
        (r"\btwice\b|\b2\s*times\b|\bbd\b|\bbid\b", MORNING_AND_NIGHT),
        (r"\bonce\b|\b1\s*times?\b|\bod\b", MORNING),
        (r"bedtime|at night|night only|\bnocte\b", NIGHT_ONLY),
        (r"morning only|\bmane\b", MORNING_ONLY),
    ]
    .into_iter()
    .map(|(pattern, label)| (Regex::new(pattern).expect("valid frequency pattern"), label))
    .collect()
});

/// Every label the parser can emit.
static CANONICAL_LABELS: LazyLock<Vec<String>> = LazyLock::new(|| {
    let mut labels: Vec<String> = [
        MORNING,
        MORNING_AND_NIGHT,
        THREE_TIMES_DAILY,
        FOUR_TIMES_DAILY,
        AS_NEEDED,
        AT_BEDTIME,
        IMMEDIATELY,
        NIGHT_ONLY,
        MORNING_ONLY,
        AS_DIRECTED,
    ]
    .iter()
    .map(|label| label.to_string())
    .collect();

    for mask in 1u8..8 {
        let label = slot_label([mask & 0b100 != 0, mask & 0b010 != 0, mask & 0b001 != 0]);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
});

/// Parse a raw frequency into a canonical schedule label.
///
/// Empty or whitespace-only input returns an empty string; anything else
/// returns a non-empty label.
pub fn parse_frequency(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    RULES
        .iter()
        .find_map(|(name, rule)| {
            rule(trimmed).inspect(|label| {
                tracing::trace!(rule = name, raw = trimmed, label = label.as_str(), "frequency matched");
            })
        })
        .unwrap_or_else(|| {
            tracing::debug!(raw = trimmed, "unrecognized frequency, using fallback");
            AS_DIRECTED.to_string()
        })
}

/// Whether `label` is one of the labels [`parse_frequency`] emits.
pub fn is_canonical_frequency(label: &str) -> bool {
    CANONICAL_LABELS.iter().any(|canonical| canonical == label)
}

/// Join enabled slots: `[true, false, true]` → "Morning and Night".
fn slot_label(enabled: [bool; 3]) -> String {
    let names: Vec<&str> = SLOT_NAMES
        .iter()
        .zip(enabled)
        .filter_map(|(name, on)| on.then_some(*name))
        .collect();

    if names.is_empty() {
        AS_DIRECTED.to_string()
    } else {
        names.join(" and ")
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn canonical_label(raw: &str) -> Option<String> {
    let key = collapse_whitespace(raw).to_lowercase();
    CANONICAL_LABELS
        .iter()
        .find(|label| label.to_lowercase() == key)
        .cloned()
}

fn abbreviation(raw: &str) -> Option<String> {
    let key = collapse_whitespace(&raw.replace('.', "")).to_lowercase();
    ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == key)
        .map(|(_, label)| label.to_string())
}

fn slot_tokens(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    let tokens: Vec<&str> = TOKEN_SEPARATOR
        .split(&lower)
        .filter(|token| !token.is_empty())
        .collect();

    if tokens.len() != 3 || !tokens.iter().all(|t| matches!(*t, "0" | "1" | "2")) {
        return None;
    }

    Some(slot_label([tokens[0] != "0", tokens[1] != "0", tokens[2] != "0"]))
}

fn binary_string(raw: &str) -> Option<String> {
    let digits: Vec<char> = raw.chars().collect();
    if digits.len() != 3 || !digits.iter().all(|c| matches!(c, '0' | '1')) {
        return None;
    }

    Some(slot_label([digits[0] == '1', digits[1] == '1', digits[2] == '1']))
}

fn fuzzy_phrase(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    FUZZY_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&lower))
        .map(|(_, label)| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviations() {
        assert_eq!(parse_frequency("OD"), MORNING);
        assert_eq!(parse_frequency("qd"), MORNING);
        assert_eq!(parse_frequency("B.D."), MORNING_AND_NIGHT);
        assert_eq!(parse_frequency("bid"), MORNING_AND_NIGHT);
        assert_eq!(parse_frequency("TDS"), THREE_TIMES_DAILY);
        assert_eq!(parse_frequency("t.i.d."), THREE_TIMES_DAILY);
        assert_eq!(parse_frequency("QID"), FOUR_TIMES_DAILY);
        assert_eq!(parse_frequency("SOS"), AS_NEEDED);
        assert_eq!(parse_frequency("prn"), AS_NEEDED);
        assert_eq!(parse_frequency("HS"), AT_BEDTIME);
        assert_eq!(parse_frequency("Stat"), IMMEDIATELY);
        assert_eq!(parse_frequency("nocte"), NIGHT_ONLY);
        assert_eq!(parse_frequency("MANE"), MORNING_ONLY);
        assert_eq!(parse_frequency("Twice  Daily"), MORNING_AND_NIGHT);
    }

    #[test]
    fn test_slot_tokens() {
        assert_eq!(parse_frequency("1-0-1"), "Morning and Night");
        assert_eq!(parse_frequency("1 / 1 / 1"), "Morning and Afternoon and Night");
        assert_eq!(parse_frequency("0.0.1"), "Night");
        assert_eq!(parse_frequency("1 to 0 to 0"), "Morning");
        assert_eq!(parse_frequency("1to0to1"), "Morning and Night");
        assert_eq!(parse_frequency("0 TO 1to 1"), "Afternoon and Night");
        assert_eq!(parse_frequency("2-0-2"), "Morning and Night");
        assert_eq!(parse_frequency("0-1-1"), "Afternoon and Night");
        assert_eq!(parse_frequency("0-0-0"), AS_DIRECTED);
    }

    #[test]
    fn test_slot_tokens_rejects_other_shapes() {
        assert_eq!(slot_tokens("1-0"), None);
        assert_eq!(slot_tokens("1-0-1-1"), None);
        assert_eq!(slot_tokens("1-3-1"), None);
        assert_eq!(slot_tokens("0.5"), None);
    }

    #[test]
    fn test_binary_string() {
        assert_eq!(parse_frequency("101"), "Morning and Night");
        assert_eq!(parse_frequency("111"), "Morning and Afternoon and Night");
        assert_eq!(parse_frequency("010"), "Afternoon");
        assert_eq!(parse_frequency("000"), AS_DIRECTED);
        assert_eq!(binary_string("201"), None);
    }

    #[test]
    fn test_fuzzy_phrases() {
        assert_eq!(parse_frequency("take when required"), AS_NEEDED);
        assert_eq!(parse_frequency("four times a day"), FOUR_TIMES_DAILY);
        assert_eq!(parse_frequency("3 times a day after meals"), THREE_TIMES_DAILY);
        assert_eq!(parse_frequency("2 times daily"), MORNING_AND_NIGHT);
        assert_eq!(parse_frequency("once in the morning"), MORNING);
        assert_eq!(parse_frequency("one tab at bedtime"), NIGHT_ONLY);
        assert_eq!(parse_frequency("morning only please"), MORNING_ONLY);
    }

    #[test]
    fn test_fuzzy_priority() {
        // "as needed" outranks the count phrases
        assert_eq!(parse_frequency("twice daily as needed"), AS_NEEDED);
        assert_eq!(parse_frequency("thrice, then twice"), THREE_TIMES_DAILY);
    }

    #[test]
    fn test_abbreviation_needs_word_boundary() {
        assert_eq!(parse_frequency("after food"), AS_DIRECTED);
        assert_eq!(parse_frequency("bdx"), AS_DIRECTED);
    }

    #[test]
    fn test_empty_and_fallback() {
        assert_eq!(parse_frequency(""), "");
        assert_eq!(parse_frequency("   "), "");
        assert_eq!(parse_frequency("garbled xyz"), AS_DIRECTED);
    }

    #[test]
    fn test_canonical_labels_are_stable() {
        for label in CANONICAL_LABELS.iter() {
            assert_eq!(&parse_frequency(label), label);
            assert!(is_canonical_frequency(label));
        }
        assert_eq!(parse_frequency("morning and night"), MORNING_AND_NIGHT);
    }
}
