#![allow(dead_code)]

use jiff::civil::date;
use vbc_core::Period;
use vbc_core::models::claim::{MedicalClaim, PharmacyClaim};
use vbc_core::models::member::Member;
use vbc_core::models::quality_measure::{MeasureCategory, QualityMeasure};

pub fn member(id: usize, score: Option<f64>) -> Member {
    Member {
        member_id: format!("M{id:05}"),
        first_name: Some("Pat".to_string()),
        last_name: Some("Doe".to_string()),
        date_of_birth: Some(date(1955, 4, 2)),
        gender: None,
        attribution_start: Some(date(2023, 7, 1)),
        attribution_end: None,
        pcp_id: None,
        hcc_risk_score: score,
        risk_category: None,
    }
}

pub fn medical(id: &str, member: &str, month: i8, paid: f64) -> MedicalClaim {
    MedicalClaim {
        claim_id: id.to_string(),
        member_id: member.to_string(),
        service_date: Some(date(2024, month, 15)),
        paid_date: Some(date(2024, month, 28)),
        paid_amount: Some(paid),
        allowed_amount: None,
        primary_diagnosis: None,
        place_of_service: None,
        er_visit: false,
        inpatient_admit: false,
    }
}

pub fn pharmacy(id: &str, member: &str, month: i8, paid: f64, generic: bool) -> PharmacyClaim {
    PharmacyClaim {
        claim_id: id.to_string(),
        member_id: member.to_string(),
        fill_date: Some(date(2024, month, 3)),
        paid_amount: Some(paid),
        drug_name: Some("atorvastatin".to_string()),
        generic,
        days_supply: Some(30),
    }
}

pub fn measure(
    id: &str,
    category: MeasureCategory,
    numerator: u32,
    denominator: u32,
    month: i8,
) -> QualityMeasure {
    QualityMeasure {
        measure_id: id.to_string(),
        name: Some(id.to_string()),
        category: Some(category),
        numerator,
        denominator,
        exclusions: 0,
        benchmark: None,
        weight: 1.0,
        period: Period { year: 2024, month },
    }
}

/// One measure per category, all at the same rate.
pub fn uniform_measures(rate_pct: u32, month: i8) -> Vec<QualityMeasure> {
    MeasureCategory::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| measure(&format!("Q{i}"), *c, rate_pct, 100, month))
        .collect()
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}
