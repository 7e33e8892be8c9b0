#![allow(dead_code)]

use jiff::civil::{Date, date};
use vbc_core::Period;
use vbc_core::models::claim::{MedicalClaim, PharmacyClaim};
use vbc_core::models::dataset::Dataset;
use vbc_core::models::member::{Gender, Member};
use vbc_core::models::quality_measure::{MeasureCategory, QualityMeasure};
use vbc_validation::ValidationContext;

pub fn as_of() -> Date {
    date(2024, 7, 1)
}

pub fn ctx() -> ValidationContext {
    ValidationContext::new(as_of())
}

pub fn member(id: usize) -> Member {
    Member {
        member_id: format!("M{id:04}"),
        first_name: Some("Pat".to_string()),
        last_name: Some(format!("Member{id}")),
        date_of_birth: Some(date(1950, 1, 1)),
        gender: Some(if id % 2 == 0 { Gender::Female } else { Gender::Male }),
        attribution_start: Some(date(2024, 1, 1)),
        attribution_end: None,
        pcp_id: Some("P1".to_string()),
        hcc_risk_score: Some(1.0),
        risk_category: None,
    }
}

pub fn medical(id: usize, member: usize) -> MedicalClaim {
    MedicalClaim {
        claim_id: format!("C{id:05}"),
        member_id: format!("M{member:04}"),
        service_date: Some(date(2024, 3, 10)),
        paid_date: Some(date(2024, 4, 2)),
        paid_amount: Some(250.0),
        allowed_amount: Some(300.0),
        primary_diagnosis: Some("E11.9".to_string()),
        place_of_service: Some("11".to_string()),
        er_visit: false,
        inpatient_admit: false,
    }
}

pub fn pharmacy(id: usize, member: usize) -> PharmacyClaim {
    PharmacyClaim {
        claim_id: format!("RX{id:05}"),
        member_id: format!("M{member:04}"),
        fill_date: Some(date(2024, 2, 14)),
        paid_amount: Some(42.5),
        drug_name: Some("metformin".to_string()),
        generic: true,
        days_supply: Some(30),
    }
}

pub fn measure(id: &str, category: MeasureCategory) -> QualityMeasure {
    QualityMeasure {
        measure_id: id.to_string(),
        name: Some(format!("Measure {id}")),
        category: Some(category),
        numerator: 80,
        denominator: 100,
        exclusions: 0,
        benchmark: Some(75.0),
        weight: 1.0,
        period: Period { year: 2024, month: 6 },
    }
}

/// 20 members, 200 medical claims, 100 pharmacy claims, one measure per
/// category. Passes every rule.
pub fn clean_dataset() -> Dataset {
    Dataset {
        members: (0..20).map(member).collect(),
        medical_claims: (0..200).map(|i| medical(i, i % 20)).collect(),
        pharmacy_claims: (0..100).map(|i| pharmacy(i, i % 20)).collect(),
        quality_measures: MeasureCategory::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| measure(&format!("Q{i}"), *c))
            .collect(),
    }
}
