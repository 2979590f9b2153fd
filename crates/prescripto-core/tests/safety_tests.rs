//! Safety engine tests: documented scenarios plus property checks.

use proptest::prelude::*;

use prescripto_core::models::{
    Confidence, ExtractedData, Medicine, MedicineType, OverallRisk, SafetyRule, Severity,
    LOW_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
};
use prescripto_core::normalizer::{is_canonical_frequency, parse_frequency};
use prescripto_core::{analyze_safety, build_summary};

fn medicine(name: &str, dosage: &str, confidence: Confidence) -> Medicine {
    Medicine {
        name: name.into(),
        medicine_type: MedicineType::Tablet,
        dosage: dosage.into(),
        frequency: "Morning".into(),
        confidence,
        ..Default::default()
    }
}

fn record(medicines: Vec<Medicine>) -> ExtractedData {
    ExtractedData {
        medicines,
        ..Default::default()
    }
}

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
fn test_documented_scenarios() {
    let clean = analyze_safety(&record(vec![medicine("Paracetamol", "500mg", Confidence::High)]));
    assert!(clean.flags.is_empty());
    assert_eq!((clean.safety_score, clean.overall_risk), (100, OverallRisk::Low));

    let empty = analyze_safety(&record(vec![]));
    assert_eq!(empty.flags.len(), 1);
    assert_eq!(empty.flags[0].rule, SafetyRule::EmptyExtraction);
    assert_eq!(empty.flags[0].severity, Severity::Critical);
    assert_eq!((empty.safety_score, empty.overall_risk), (70, OverallRisk::Medium));

    let broken = analyze_safety(&record(vec![medicine("", "", Confidence::Low)]));
    let rules: Vec<SafetyRule> = broken.flags.iter().map(|f| f.rule).collect();
    assert_eq!(
        rules,
        vec![SafetyRule::MissingName, SafetyRule::MissingDosage, SafetyRule::LowConfidence]
    );
    assert_eq!((broken.safety_score, broken.overall_risk), (30, OverallRisk::High));
}

#[test]
fn test_suspicious_dosage_thresholds() {
    let cases = [
        ("5000mg", true),
        ("2000mg", false),
        ("2000.5mg", true),
        ("500mg", false),
        ("two tablets", false),
        ("-1 ml", true),
        ("0mg", false),
    ];

    for (dosage, suspicious) in cases {
        let analysis = analyze_safety(&record(vec![medicine("A", dosage, Confidence::High)]));
        let fired = analysis
            .flags
            .iter()
            .any(|f| f.rule == SafetyRule::SuspiciousDosage);
        assert_eq!(fired, suspicious, "dosage {:?}", dosage);
    }
}

#[test]
fn test_summary_counts_match_flags() {
    let data = record(vec![
        medicine("A", "", Confidence::Medium),
        medicine("B", "9000mg", Confidence::Low),
    ]);
    let analysis = analyze_safety(&data);
    let summary = build_summary(&data, &analysis);

    assert_eq!(summary.safety.critical_count, 1);
    assert_eq!(summary.safety.warning_count, 2);
    assert_eq!(summary.safety.score, 50);
    assert_eq!(summary.safety.display, "🟡 50/100");
    assert_eq!(summary.medicines[1].dose, "9000mg | Morning");
}

fn arb_confidence() -> impl Strategy<Value = Confidence> {
    prop_oneof![
        Just(Confidence::High),
        Just(Confidence::Medium),
        Just(Confidence::Low),
    ]
}

fn arb_medicine() -> impl Strategy<Value = Medicine> {
    (
        prop_oneof![Just(String::new()), "[A-Za-z ]{1,20}"],
        prop_oneof![Just(String::new()), "-?[0-9]{1,5}(mg|ml)?", "[a-z ]{1,10}"],
        arb_confidence(),
    )
        .prop_map(|(name, dosage, confidence)| medicine(&name, &dosage, confidence))
}

proptest! {
    #[test]
    fn prop_score_in_range_and_risk_consistent(medicines in prop::collection::vec(arb_medicine(), 0..8)) {
        let analysis = analyze_safety(&record(medicines));

        prop_assert!(analysis.safety_score <= 100);
        prop_assert_eq!(analysis.overall_risk, OverallRisk::from_score(analysis.safety_score));

        let expected = 100i64
            - 30 * analysis.critical_count() as i64
            - 10 * analysis.warning_count() as i64;
        prop_assert_eq!(i64::from(analysis.safety_score), expected.clamp(0, 100));
    }

    #[test]
    fn prop_risk_tiers(score in 0u32..=100) {
        let risk = OverallRisk::from_score(score);
        let expected = if score >= LOW_RISK_THRESHOLD {
            OverallRisk::Low
        } else if score >= MEDIUM_RISK_THRESHOLD {
            OverallRisk::Medium
        } else {
            OverallRisk::High
        };
        prop_assert_eq!(risk, expected);
    }

    #[test]
    fn prop_flags_point_at_real_medicines(medicines in prop::collection::vec(arb_medicine(), 1..8)) {
        let count = medicines.len();
        let analysis = analyze_safety(&record(medicines));

        for flag in &analysis.flags {
            let index: usize = flag.field
                .trim_start_matches("medicines[")
                .split(']')
                .next()
                .and_then(|n| n.parse().ok())
                .expect("flag field has an index");
            prop_assert!(index < count);
        }
    }

    #[test]
    fn prop_frequency_is_total(raw in "\\PC{0,30}") {
        let label = parse_frequency(&raw);
        if raw.trim().is_empty() {
            prop_assert_eq!(label, "");
        } else {
            prop_assert!(is_canonical_frequency(&label), "{:?} -> {:?}", raw, label);
        }
    }

    #[test]
    fn prop_frequency_is_idempotent(raw in "[0-2 ./a-zA-Z-]{0,20}") {
        let once = parse_frequency(&raw);
        prop_assert_eq!(parse_frequency(&once), once);
    }
}
