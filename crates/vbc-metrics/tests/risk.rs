mod common;

use common::{assert_close, medical, member};
use vbc_core::Period;
use vbc_core::models::contract::RiskCutPoints;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::member::RiskCategory;
use vbc_metrics::risk;

#[test]
fn high_risk_share_of_reference_population() {
    let members = (0..7779)
        .map(|i| member(i, Some(if i < 1600 { 2.1 } else { 0.5 })))
        .collect();
    let ds = Dataset {
        members,
        ..Dataset::default()
    };
    let period = Period::new(2024, 11).unwrap();
    let strat = risk::stratify(&ds, &RiskCutPoints::default(), &period).unwrap();

    assert_eq!(strat.high_risk_count, 1600);
    assert_close(strat.high_risk_pct, 20.57, 0.005);
    assert_eq!(
        strat.low_risk_count + strat.medium_risk_count + strat.high_risk_count,
        7779
    );
    assert_close(
        strat.low_risk_pct + strat.medium_risk_pct + strat.high_risk_pct,
        100.0,
        1e-9,
    );
}

#[test]
fn assigned_categories_agree_with_stratification() {
    let mut members: Vec<_> = [Some(0.5), Some(1.2), Some(2.4), None]
        .into_iter()
        .enumerate()
        .map(|(i, score)| member(i, score))
        .collect();
    members[0].risk_category = Some(RiskCategory::High);

    let cuts = RiskCutPoints::default();
    risk::assign_categories(&mut members, &cuts);
    let assigned: Vec<_> = members.iter().map(|m| m.risk_category).collect();
    assert_eq!(
        assigned,
        vec![
            Some(RiskCategory::Low),
            Some(RiskCategory::Medium),
            Some(RiskCategory::High),
            Some(RiskCategory::Medium),
        ]
    );

    let ds = Dataset {
        members,
        ..Dataset::default()
    };
    let strat = risk::stratify(&ds, &cuts, &Period::new(2024, 6).unwrap()).unwrap();
    let high = ds
        .members
        .iter()
        .filter(|m| m.risk_category == Some(RiskCategory::High))
        .count() as u64;
    assert_eq!(strat.high_risk_count, high);
}

#[test]
fn cut_points_are_half_open() {
    let cuts = RiskCutPoints::default();
    let at = |score| risk::categorize(&member(0, Some(score)), &cuts);
    assert_eq!(at(0.79), RiskCategory::Low);
    assert_eq!(at(0.8), RiskCategory::Medium);
    assert_eq!(at(1.49), RiskCategory::Medium);
    assert_eq!(at(1.5), RiskCategory::High);
}

#[test]
fn missing_score_is_neutral() {
    let m = member(0, None);
    assert_eq!(risk::risk_score(&m), 1.0);
    assert_eq!(
        risk::categorize(&m, &RiskCutPoints::default()),
        RiskCategory::Medium
    );
}

#[test]
fn spending_is_attributed_to_the_member_category() {
    let ds = Dataset {
        members: vec![member(0, Some(0.4)), member(1, Some(3.0))],
        medical_claims: vec![
            medical("C1", "M00000", 1, 100.0),
            medical("C2", "M00001", 2, 5_000.0),
            medical("C3", "UNKNOWN", 2, 77.0),
        ],
        ..Dataset::default()
    };
    let period = Period::new(2024, 2).unwrap();
    let strat = risk::stratify(&ds, &RiskCutPoints::default(), &period).unwrap();

    assert_eq!(strat.low_risk_spending, 100.0);
    assert_eq!(strat.high_risk_spending, 5_000.0);
    assert_eq!(strat.medium_risk_spending, 0.0);
    // Two member-months in each populated category.
    assert_eq!(strat.low_risk_pmpm, 50.0);
    assert_eq!(strat.high_risk_pmpm, 2_500.0);
    assert_close(strat.average_risk_score, 1.7, 1e-9);
}

#[test]
fn empty_population_yields_zeroes() {
    let period = Period::new(2024, 2).unwrap();
    let strat = risk::stratify(&Dataset::default(), &RiskCutPoints::default(), &period).unwrap();
    assert_eq!(strat.total_members, 0);
    assert_eq!(strat.high_risk_pct, 0.0);
    assert_eq!(strat.average_risk_score, 0.0);
}
