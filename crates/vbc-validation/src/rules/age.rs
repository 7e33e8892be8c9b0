use vbc_core::models::dataset::{Dataset, DatasetKind};
use vbc_core::models::validation::{RuleId, Severity, ValidationResult};

use crate::context::ValidationContext;
use crate::record::{Finding, Keyed};

/// Members whose age on the evaluation date is negative or beyond `max_age`.
/// Members without a birth date are left to the null-rate check.
pub fn evaluate(dataset: &Dataset, ctx: &ValidationContext) -> Vec<ValidationResult> {
    let max_age = ctx.thresholds.max_age;
    let affected: Vec<_> = dataset
        .members
        .iter()
        .filter(|m| {
            m.age_on(ctx.as_of)
                .is_some_and(|age| !(0..=max_age).contains(&age))
        })
        .map(Keyed::record_ref)
        .collect();

    if affected.is_empty() {
        return Vec::new();
    }
    let count = affected.len();
    vec![
        Finding::new(
            RuleId::AgeRange,
            DatasetKind::Members,
            Severity::Critical,
            dataset.members.len(),
        )
        .field("date_of_birth")
        .affected(affected)
        .describe(format!(
            "{count} members have an age outside [0, {max_age}] on {}",
            ctx.as_of
        )),
    ]
}
