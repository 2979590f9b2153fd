//! Safety analysis models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scores at or above this are low risk.
pub const LOW_RISK_THRESHOLD: u32 = 80;
/// Scores at or above this (and below [`LOW_RISK_THRESHOLD`]) are medium risk.
pub const MEDIUM_RISK_THRESHOLD: u32 = 50;

/// Flag severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Warning => "WARNING",
        }
    }
}

/// Deterministic safety rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyRule {
    /// No medicines at all (fires once per record)
    EmptyExtraction,
    /// Medicine name empty or whitespace
    MissingName,
    /// Dosage empty or whitespace
    MissingDosage,
    /// Model reported low confidence
    LowConfidence,
    /// Leading numeric dosage outside the plausible range
    SuspiciousDosage,
}

impl SafetyRule {
    pub fn severity(&self) -> Severity {
        match self {
            SafetyRule::EmptyExtraction | SafetyRule::MissingName | SafetyRule::MissingDosage => {
                Severity::Critical
            }
            SafetyRule::LowConfidence | SafetyRule::SuspiciousDosage => Severity::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyRule::EmptyExtraction => "EMPTY_EXTRACTION",
            SafetyRule::MissingName => "MISSING_NAME",
            SafetyRule::MissingDosage => "MISSING_DOSAGE",
            SafetyRule::LowConfidence => "LOW_CONFIDENCE",
            SafetyRule::SuspiciousDosage => "SUSPICIOUS_DOSAGE",
        }
    }
}

impl fmt::Display for SafetyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule violation recorded against a specific field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyFlag {
    /// Path of the offending field (e.g., "medicines[2].dosage")
    pub field: String,
    pub rule: SafetyRule,
    pub severity: Severity,
    /// Human-readable explanation
    pub message: String,
}

impl SafetyFlag {
    /// Create a flag; severity follows the rule.
    pub fn new(field: impl Into<String>, rule: SafetyRule, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            severity: rule.severity(),
            message: message.into(),
        }
    }
}

/// Coarse risk tier derived from the safety score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallRisk {
    Low,
    Medium,
    High,
}

impl OverallRisk {
    pub fn from_score(score: u32) -> Self {
        if score >= LOW_RISK_THRESHOLD {
            OverallRisk::Low
        } else if score >= MEDIUM_RISK_THRESHOLD {
            OverallRisk::Medium
        } else {
            OverallRisk::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallRisk::Low => "low",
            OverallRisk::Medium => "medium",
            OverallRisk::High => "high",
        }
    }
}

impl fmt::Display for OverallRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running the safety rules over an extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyAnalysis {
    /// 0 - 100, higher is safer
    pub safety_score: u32,
    /// Flags in rule-evaluation order
    pub flags: Vec<SafetyFlag>,
    pub overall_risk: OverallRisk,
}

impl SafetyAnalysis {
    pub fn critical_count(&self) -> usize {
        self.count_severity(Severity::Critical)
    }

    pub fn warning_count(&self) -> usize {
        self.count_severity(Severity::Warning)
    }

    /// Flags raised against the medicine at `index`.
    pub fn flags_for_medicine(&self, index: usize) -> impl Iterator<Item = &SafetyFlag> {
        let exact = format!("medicines[{}]", index);
        let nested = format!("medicines[{}].", index);
        self.flags
            .iter()
            .filter(move |f| f.field == exact || f.field.starts_with(&nested))
    }

    fn count_severity(&self, severity: Severity) -> usize {
        self.flags.iter().filter(|f| f.severity == severity).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_boundaries() {
        assert_eq!(OverallRisk::from_score(100), OverallRisk::Low);
        assert_eq!(OverallRisk::from_score(80), OverallRisk::Low);
        assert_eq!(OverallRisk::from_score(79), OverallRisk::Medium);
        assert_eq!(OverallRisk::from_score(50), OverallRisk::Medium);
        assert_eq!(OverallRisk::from_score(49), OverallRisk::High);
        assert_eq!(OverallRisk::from_score(0), OverallRisk::High);
    }

    #[test]
    fn test_flag_severity_follows_rule() {
        let flag = SafetyFlag::new("medicines[0].name", SafetyRule::MissingName, "no name");
        assert_eq!(flag.severity, Severity::Critical);

        let flag = SafetyFlag::new("medicines[0]", SafetyRule::LowConfidence, "low");
        assert_eq!(flag.severity, Severity::Warning);
    }

    #[test]
    fn test_wire_format() {
        let analysis = SafetyAnalysis {
            safety_score: 70,
            flags: vec![SafetyFlag::new(
                "medicines",
                SafetyRule::EmptyExtraction,
                "No medicines could be extracted from image",
            )],
            overall_risk: OverallRisk::Medium,
        };

        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.contains("\"safetyScore\":70"));
        assert!(json.contains("\"rule\":\"EMPTY_EXTRACTION\""));
        assert!(json.contains("\"severity\":\"CRITICAL\""));
        assert!(json.contains("\"overallRisk\":\"medium\""));
    }

    #[test]
    fn test_flags_for_medicine() {
        let analysis = SafetyAnalysis {
            safety_score: 40,
            flags: vec![
                SafetyFlag::new("medicines[1].name", SafetyRule::MissingName, ""),
                SafetyFlag::new("medicines[1]", SafetyRule::LowConfidence, ""),
                SafetyFlag::new("medicines[10].dosage", SafetyRule::MissingDosage, ""),
            ],
            overall_risk: OverallRisk::High,
        };

        assert_eq!(analysis.flags_for_medicine(1).count(), 2);
        assert_eq!(analysis.flags_for_medicine(10).count(), 1);
        assert_eq!(analysis.flags_for_medicine(0).count(), 0);
        assert_eq!(analysis.critical_count(), 2);
        assert_eq!(analysis.warning_count(), 1);
    }
}
