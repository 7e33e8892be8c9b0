//! Record-level helpers shared by the rules: primary keys, required-field
//! tables, and result construction.

use vbc_core::models::claim::{MedicalClaim, PharmacyClaim};
use vbc_core::models::dataset::{Dataset, DatasetKind, RecordRef};
use vbc_core::models::member::Member;
use vbc_core::models::quality_measure::QualityMeasure;
use vbc_core::models::validation::{RuleId, Severity, ValidationResult};

/// At most this many record references are kept on a finding. The count is
/// always exact; remediation rescans the dataset instead of trusting the list.
pub const MAX_AFFECTED_REFS: usize = 100;

pub trait Keyed {
    const KIND: DatasetKind;

    fn key(&self) -> String;

    fn record_ref(&self) -> RecordRef {
        RecordRef::new(Self::KIND, self.key())
    }
}

impl Keyed for Member {
    const KIND: DatasetKind = DatasetKind::Members;

    fn key(&self) -> String {
        self.member_id.clone()
    }
}

impl Keyed for MedicalClaim {
    const KIND: DatasetKind = DatasetKind::MedicalClaims;

    fn key(&self) -> String {
        self.claim_id.clone()
    }
}

impl Keyed for PharmacyClaim {
    const KIND: DatasetKind = DatasetKind::PharmacyClaims;

    fn key(&self) -> String {
        self.claim_id.clone()
    }
}

impl Keyed for QualityMeasure {
    const KIND: DatasetKind = DatasetKind::QualityMeasures;

    /// Measures repeat across reporting months, so the period is part of the key.
    fn key(&self) -> String {
        format!("{}@{}", self.measure_id, self.period)
    }
}

type FieldCheck<T> = (&'static str, fn(&T) -> bool);

fn present(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn member_fields() -> Vec<FieldCheck<Member>> {
    vec![
        ("member_id", |m| !m.member_id.is_empty()),
        ("first_name", |m| present(&m.first_name)),
        ("last_name", |m| present(&m.last_name)),
        ("date_of_birth", |m| m.date_of_birth.is_some()),
        ("gender", |m| m.gender.is_some()),
        ("hcc_risk_score", |m| m.hcc_risk_score.is_some()),
    ]
}

fn medical_fields() -> Vec<FieldCheck<MedicalClaim>> {
    vec![
        ("claim_id", |c| !c.claim_id.is_empty()),
        ("member_id", |c| !c.member_id.is_empty()),
        ("service_date", |c| c.service_date.is_some()),
        ("paid_amount", |c| c.paid_amount.is_some()),
    ]
}

fn pharmacy_fields() -> Vec<FieldCheck<PharmacyClaim>> {
    vec![
        ("claim_id", |c| !c.claim_id.is_empty()),
        ("member_id", |c| !c.member_id.is_empty()),
        ("fill_date", |c| c.fill_date.is_some()),
        ("paid_amount", |c| c.paid_amount.is_some()),
        ("drug_name", |c| present(&c.drug_name)),
    ]
}

fn measure_fields() -> Vec<FieldCheck<QualityMeasure>> {
    vec![
        ("measure_id", |q| !q.measure_id.is_empty()),
        ("name", |q| present(&q.name)),
        ("category", |q| q.category.is_some()),
    ]
}

/// Records lacking one required field.
pub struct FieldGap {
    pub field: &'static str,
    pub missing: Vec<RecordRef>,
    pub total: usize,
}

fn scan<T: Keyed>(records: &[T], checks: Vec<FieldCheck<T>>) -> Vec<FieldGap> {
    checks
        .into_iter()
        .map(|(field, is_present)| FieldGap {
            field,
            missing: records
                .iter()
                .filter(|r| !is_present(r))
                .map(Keyed::record_ref)
                .collect(),
            total: records.len(),
        })
        .collect()
}

/// One gap per required field of the collection, including empty ones.
pub fn required_field_gaps(dataset: &Dataset, kind: DatasetKind) -> Vec<FieldGap> {
    match kind {
        DatasetKind::Members => scan(&dataset.members, member_fields()),
        DatasetKind::MedicalClaims => scan(&dataset.medical_claims, medical_fields()),
        DatasetKind::PharmacyClaims => scan(&dataset.pharmacy_claims, pharmacy_fields()),
        DatasetKind::QualityMeasures => scan(&dataset.quality_measures, measure_fields()),
    }
}

/// Builder for a finding; keeps reference lists bounded.
pub struct Finding {
    result: ValidationResult,
}

impl Finding {
    pub fn new(rule: RuleId, dataset: DatasetKind, severity: Severity, total: usize) -> Self {
        Self {
            result: ValidationResult {
                rule,
                dataset,
                severity,
                field: None,
                affected: Vec::new(),
                affected_count: 0,
                total_records: total,
                auto_fixable: false,
                description: String::new(),
            },
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.result.field = Some(field.into());
        self
    }

    pub fn affected(mut self, refs: Vec<RecordRef>) -> Self {
        self.result.affected_count = refs.len();
        self.result.affected = refs.into_iter().take(MAX_AFFECTED_REFS).collect();
        self
    }

    pub fn auto_fixable(mut self, fixable: bool) -> Self {
        self.result.auto_fixable = fixable;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> ValidationResult {
        self.result.description = description.into();
        self.result
    }
}

pub fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
