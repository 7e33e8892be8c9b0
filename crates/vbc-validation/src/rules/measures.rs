use vbc_core::models::dataset::{Dataset, DatasetKind};
use vbc_core::models::quality_measure::QualityMeasure;
use vbc_core::models::validation::{RuleId, Severity, ValidationResult};

use crate::context::ValidationContext;
use crate::record::{Finding, Keyed};

fn is_inconsistent(m: &QualityMeasure) -> bool {
    m.numerator > m.denominator
        || m.exclusions > m.denominator
        || !m.weight.is_finite()
        || !(0.0..=1.0).contains(&m.weight)
}

pub fn evaluate(dataset: &Dataset, _ctx: &ValidationContext) -> Vec<ValidationResult> {
    let affected: Vec<_> = dataset
        .quality_measures
        .iter()
        .filter(|m| is_inconsistent(m))
        .map(Keyed::record_ref)
        .collect();

    if affected.is_empty() {
        return Vec::new();
    }
    let count = affected.len();
    vec![
        Finding::new(
            RuleId::MeasureIntegrity,
            DatasetKind::QualityMeasures,
            Severity::Critical,
            dataset.quality_measures.len(),
        )
        .affected(affected)
        .describe(format!(
            "{count} quality measures have numerator or exclusions above the denominator, or a weight outside [0, 1]"
        )),
    ]
}
