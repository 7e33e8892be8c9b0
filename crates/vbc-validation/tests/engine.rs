mod common;

use common::{clean_dataset, ctx, medical};
use jiff::civil::date;
use vbc_core::models::member::Gender;
use vbc_core::models::validation::RuleId;
use vbc_validation::{RuleSet, Thresholds, ValidationError, validate};

#[test]
fn clean_dataset_passes_unchanged() {
    let ds = clean_dataset();
    let outcome = validate(ds.clone(), &RuleSet::standard(), &ctx()).unwrap();
    assert_eq!(outcome.dataset, ds);
    assert!(outcome.report.findings.is_empty());
    assert!(outcome.report.passed());
    assert_eq!(outcome.report.fix_count(), 0);
}

#[test]
fn fixable_defects_are_remediated_and_resolved() {
    let mut ds = clean_dataset();
    ds.medical_claims[0].paid_amount = Some(-250.0);
    ds.medical_claims[1].primary_diagnosis = Some("O09.90".to_string());
    ds.medical_claims[2].service_date = Some(date(2025, 3, 10));
    ds.medical_claims[2].paid_date = None;
    ds.medical_claims.push(medical(9, 9));

    let outcome = validate(ds, &RuleSet::standard(), &ctx()).unwrap();
    let report = &outcome.report;

    let fixed: Vec<RuleId> = report.remediations.iter().map(|a| a.rule).collect();
    assert_eq!(
        fixed,
        vec![
            RuleId::CostAmount,
            RuleId::FutureServiceDate,
            RuleId::GenderDiagnosis,
            RuleId::Duplicates,
        ]
    );
    assert!(report.passed());
    assert!(report.unresolved.is_empty());

    let ds = &outcome.dataset;
    assert_eq!(ds.medical_claims.len(), 200);
    assert_eq!(ds.medical_claims[0].paid_amount, Some(250.0));
    assert_eq!(ds.medical_claims[2].service_date, Some(date(2024, 3, 10)));
    let member = ds.members.iter().find(|m| m.member_id == "M0001").unwrap();
    assert_eq!(member.gender, Some(Gender::Female));
}

#[test]
fn remediation_is_idempotent() {
    let mut ds = clean_dataset();
    ds.medical_claims[0].paid_amount = Some(-80.0);
    ds.pharmacy_claims[4].fill_date = Some(date(2025, 1, 20));
    ds.members.push(common::member(3));

    let first = validate(ds, &RuleSet::standard(), &ctx()).unwrap();
    assert!(first.report.fix_count() > 0);

    let second = validate(first.dataset.clone(), &RuleSet::standard(), &ctx()).unwrap();
    assert!(second.report.remediations.is_empty());
    assert_eq!(second.dataset, first.dataset);
}

#[test]
fn fixes_unlocked_by_deduplication_are_applied_in_the_same_run() {
    // 3 negatives in 201 rows is above the 1% sign-flip limit; once the
    // duplicate goes, 2 in 200 is within it.
    let mut ds = clean_dataset();
    ds.medical_claims[0].paid_amount = Some(-250.0);
    ds.medical_claims[1].paid_amount = Some(-250.0);
    let copy = ds.medical_claims[0].clone();
    ds.medical_claims.push(copy);
    assert_eq!(ds.medical_claims.len(), 201);

    let first = validate(ds, &RuleSet::standard(), &ctx()).unwrap();
    let fixed: Vec<RuleId> = first.report.remediations.iter().map(|a| a.rule).collect();
    assert_eq!(fixed, vec![RuleId::Duplicates, RuleId::CostAmount]);
    assert!(first.report.unresolved.is_empty());
    assert_eq!(first.dataset.medical_claims.len(), 200);
    assert!(
        first
            .dataset
            .medical_claims
            .iter()
            .all(|c| c.paid_amount == Some(250.0))
    );

    let second = validate(first.dataset.clone(), &RuleSet::standard(), &ctx()).unwrap();
    assert!(second.report.remediations.is_empty());
    assert_eq!(second.dataset, first.dataset);
}

#[test]
fn duplicate_survivor_does_not_depend_on_input_order() {
    let mut variant = medical(5, 5);
    variant.paid_amount = Some(999.0);

    let mut forward = clean_dataset();
    forward.medical_claims.push(variant.clone());
    let mut backward = clean_dataset();
    backward.medical_claims.insert(0, variant);

    let a = validate(forward, &RuleSet::standard(), &ctx()).unwrap();
    let b = validate(backward, &RuleSet::standard(), &ctx()).unwrap();

    let pick = |ds: &vbc_core::models::dataset::Dataset| {
        ds.medical_claims
            .iter()
            .find(|c| c.claim_id == "C00005")
            .cloned()
            .unwrap()
    };
    assert_eq!(pick(&a.dataset), pick(&b.dataset));
    assert_eq!(a.dataset.medical_claims.len(), 200);
    assert_eq!(b.dataset.medical_claims.len(), 200);
}

#[test]
fn unfixable_critical_findings_fail_validation() {
    let mut ds = clean_dataset();
    ds.medical_claims[10].service_date = Some(date(2024, 6, 1));
    let outcome = validate(ds, &RuleSet::standard(), &ctx()).unwrap();
    assert!(!outcome.report.passed());
    let critical: Vec<_> = outcome.report.unresolved_critical().collect();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].rule, RuleId::ServiceAfterPaid);
}

#[test]
fn findings_from_several_rules_can_share_a_record() {
    let mut ds = clean_dataset();
    ds.medical_claims[0].paid_amount = Some(-900_000.0);
    ds.medical_claims[0].service_date = Some(date(2024, 12, 1));
    let outcome = validate(ds, &RuleSet::standard(), &ctx()).unwrap();
    let rules: Vec<RuleId> = outcome
        .report
        .findings
        .iter()
        .filter(|f| f.affected.iter().any(|r| r.key == "C00000"))
        .map(|f| f.rule)
        .collect();
    assert!(rules.contains(&RuleId::CostAmount));
    assert!(rules.contains(&RuleId::ServiceAfterPaid));
}

#[test]
fn invalid_thresholds_are_rejected() {
    let thresholds = Thresholds {
        critical_null_rate: 1.5,
        ..Thresholds::default()
    };
    let ctx = ctx().with_thresholds(thresholds);
    let err = validate(clean_dataset(), &RuleSet::standard(), &ctx).unwrap_err();
    assert!(matches!(
        err,
        ValidationError::InvalidThreshold {
            name: "critical_null_rate",
            ..
        }
    ));
}
