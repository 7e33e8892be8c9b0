mod common;

use common::{assert_close, medical, member, uniform_measures};
use vbc_core::Period;
use vbc_core::models::contract::ContractParams;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::metrics::{InsightCategory, InsightSeverity, QualityGateStatus};
use vbc_metrics::{AnalysisSettings, analyze, stats};

/// 100 members, $1,000 of claims per month, 12 × 10,000 baseline.
fn steady_dataset(months: i8) -> Dataset {
    Dataset {
        members: (0..100).map(|i| member(i, Some(1.0))).collect(),
        medical_claims: (1..=months)
            .map(|m| medical(&format!("C{m}"), "M00000", m, 1_000.0))
            .collect(),
        pharmacy_claims: Vec::new(),
        quality_measures: uniform_measures(90, months),
    }
}

#[test]
fn normal_cdf_reference_points() {
    assert_close(stats::normal_cdf(0.0), 0.5, 1e-7);
    assert_close(stats::normal_cdf(1.96), 0.975, 1e-4);
    assert_close(stats::normal_cdf(-1.96), 0.025, 1e-4);
}

#[test]
fn probability_is_monotonic_and_saturates() {
    let mut last = 0.0;
    for margin in [-50.0, -10.0, -1.0, 0.0, 1.0, 10.0, 50.0] {
        let p = stats::probability_at_least(margin, 0.0, 5.0);
        assert!(p >= last);
        assert!((0.0..=100.0).contains(&p));
        last = p;
    }
    assert!(stats::probability_at_least(-50.0, 0.0, 5.0) < 0.01);
    assert!(stats::probability_at_least(50.0, 0.0, 5.0) > 99.99);
    assert_eq!(stats::probability_at_least(1.0, 0.0, 0.0), 100.0);
    assert_eq!(stats::probability_at_least(-1.0, 0.0, 0.0), 0.0);
}

#[test]
fn sample_std_dev_needs_two_points() {
    assert_eq!(stats::sample_std_dev(&[4.0]), None);
    assert_close(stats::sample_std_dev(&[2.0, 4.0, 6.0]).unwrap(), 2.0, 1e-12);
}

#[test]
fn projection_applies_december_uplift() {
    let params = ContractParams::new("ACO-1", 120_000.0);
    let period = Period::new(2024, 6).unwrap();
    let report = analyze(&steady_dataset(6), &params, &period, &AnalysisSettings::default()).unwrap();
    let p = &report.predictions;

    // Six observed months plus five at run rate and December at 110%.
    assert_close(p.projected_year_end_spending, 6_000.0 + 5_000.0 + 1_100.0, 1e-6);
    assert_close(p.projected_year_end_savings, 120_000.0 - 12_100.0, 1e-6);
    assert_close(p.target_savings, 6_000.0, 1e-9);
    assert_eq!(p.current_month, 6);
}

#[test]
fn flat_history_falls_back_to_zero_spread_then_saturates() {
    let params = ContractParams::new("ACO-1", 120_000.0);
    let period = Period::new(2024, 6).unwrap();
    let report = analyze(&steady_dataset(6), &params, &period, &AnalysisSettings::default()).unwrap();
    let p = &report.predictions;

    // Identical monthly savings: sample spread is zero, so bounds collapse.
    assert_close(p.savings_lower_bound, p.projected_year_end_savings, 1e-6);
    assert_close(p.savings_upper_bound, p.projected_year_end_savings, 1e-6);
    assert_eq!(p.probability_meeting_target, 100.0);
}

#[test]
fn single_month_uses_fallback_volatility() {
    let params = ContractParams::new("ACO-1", 120_000.0);
    let period = Period::new(2024, 1).unwrap();
    let report = analyze(&steady_dataset(1), &params, &period, &AnalysisSettings::default()).unwrap();
    let p = &report.predictions;

    let sigma = 10_000.0 * 0.10 * 11f64.sqrt();
    assert_close(
        p.savings_upper_bound - p.savings_lower_bound,
        2.0 * 1.96 * sigma,
        1e-6,
    );
    assert!(p.probability_meeting_target > 99.0);
}

#[test]
fn bounds_collapse_in_december() {
    let params = ContractParams::new("ACO-1", 120_000.0);
    let period = Period::new(2024, 12).unwrap();
    let report = analyze(&steady_dataset(12), &params, &period, &AnalysisSettings::default()).unwrap();
    let p = &report.predictions;
    assert_close(p.projected_year_end_spending, report.financial.actual_spending, 1e-9);
    assert_eq!(p.savings_lower_bound, p.savings_upper_bound);
}

#[test]
fn overspending_is_a_financial_risk() {
    let params = ContractParams::new("ACO-1", 5_000.0);
    let period = Period::new(2024, 6).unwrap();
    let report = analyze(&steady_dataset(6), &params, &period, &AnalysisSettings::default()).unwrap();
    let p = &report.predictions;

    let financial = p
        .risks
        .iter()
        .find(|r| r.category == InsightCategory::Financial)
        .unwrap();
    assert_eq!(financial.severity, InsightSeverity::High);
    assert!(p.opportunities.iter().all(|o| o.category != InsightCategory::Financial));
    // Losses are projected the same way the financial calculation shares them.
    assert!(p.projected_year_end_savings < 0.0);
    assert_close(
        p.projected_shared_savings,
        p.projected_year_end_savings * params.sharing_rate,
        1e-9,
    );
}

#[test]
fn strong_savings_and_quality_shortfall_are_reported() {
    let params = ContractParams::new("ACO-1", 120_000.0);
    let period = Period::new(2024, 6).unwrap();
    let mut ds = steady_dataset(6);
    ds.quality_measures = uniform_measures(60, 6);
    let report = analyze(&ds, &params, &period, &AnalysisSettings::default()).unwrap();
    let p = &report.predictions;

    assert!(
        p.opportunities
            .iter()
            .any(|o| o.category == InsightCategory::Financial
                && o.severity == InsightSeverity::Positive)
    );
    let quality = p
        .risks
        .iter()
        .find(|r| r.category == InsightCategory::Quality)
        .unwrap();
    assert_eq!(quality.severity, InsightSeverity::High);
    assert_eq!(quality.title, "Quality gate not met");
    assert_eq!(report.quality.quality_gate_status, QualityGateStatus::Ineligible);
    assert!(p.probability_quality_gate < 1.0);
}

#[test]
fn closable_quality_shortfall_is_reported_as_at_risk() {
    let params = ContractParams::new("ACO-1", 120_000.0);
    let period = Period::new(2024, 6).unwrap();
    let mut ds = steady_dataset(6);
    ds.quality_measures = uniform_measures(77, 6);
    let report = analyze(&ds, &params, &period, &AnalysisSettings::default()).unwrap();
    assert_eq!(report.quality.quality_gate_status, QualityGateStatus::AtRisk);

    let quality = report
        .predictions
        .risks
        .iter()
        .find(|r| r.category == InsightCategory::Quality)
        .unwrap();
    assert_eq!(quality.title, "Quality gate at risk");
    assert_eq!(quality.severity, InsightSeverity::Medium);
}

#[test]
fn high_er_use_and_risk_concentration_are_risks() {
    let params = ContractParams::new("ACO-1", 120_000.0);
    let period = Period::new(2024, 1).unwrap();
    let mut ds = steady_dataset(1);
    for m in ds.members.iter_mut().take(30) {
        m.hcc_risk_score = Some(2.5);
    }
    for i in 0..50 {
        let mut claim = medical(&format!("ER{i}"), "M00001", 1, 10.0);
        claim.er_visit = true;
        ds.medical_claims.push(claim);
    }
    let report = analyze(&ds, &params, &period, &AnalysisSettings::default()).unwrap();
    let categories: Vec<_> = report.predictions.risks.iter().map(|r| r.category).collect();
    assert!(categories.contains(&InsightCategory::Utilization));
    assert!(categories.contains(&InsightCategory::Population));
}
