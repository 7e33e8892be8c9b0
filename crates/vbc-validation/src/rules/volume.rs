use vbc_core::models::dataset::Dataset;
use vbc_core::models::validation::{RuleId, Severity, ValidationResult};

use crate::context::ValidationContext;
use crate::record::Finding;

/// Compares record counts against configured expectations.
pub fn evaluate(dataset: &Dataset, ctx: &ValidationContext) -> Vec<ValidationResult> {
    let tolerance = ctx.thresholds.volume_tolerance;
    ctx.expected_volumes
        .iter()
        .filter_map(|(&kind, &expected)| {
            let actual = dataset.len(kind);
            let deviation = actual.abs_diff(expected) as f64;
            if deviation <= expected as f64 * tolerance {
                return None;
            }
            Some(
                Finding::new(RuleId::VolumeConsistency, kind, Severity::Warning, actual)
                    .describe(format!(
                        "{kind} has {actual} records, expected {expected} (±{:.0}%)",
                        tolerance * 100.0
                    )),
            )
        })
        .collect()
}
