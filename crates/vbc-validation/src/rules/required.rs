//! Presence checks for required fields.
//!
//! A field missing from every row of a non-empty collection is a structural
//! problem with the extract (`required_fields`); a field missing from only
//! some rows is a completeness problem (`null_rate`).

use vbc_core::models::dataset::{Dataset, DatasetKind};
use vbc_core::models::validation::{RuleId, Severity, ValidationResult};

use crate::context::ValidationContext;
use crate::record::{Finding, ratio, required_field_gaps};

pub fn evaluate_required(dataset: &Dataset, _ctx: &ValidationContext) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    for kind in DatasetKind::ALL {
        for gap in required_field_gaps(dataset, kind) {
            if gap.total == 0 || gap.missing.len() != gap.total {
                continue;
            }
            let total = gap.total;
            results.push(
                Finding::new(RuleId::RequiredFields, kind, Severity::Critical, total)
                    .field(gap.field)
                    .affected(gap.missing)
                    .describe(format!(
                        "required field '{}' is absent from all {total} {kind} records",
                        gap.field
                    )),
            );
        }
    }
    results
}

pub fn evaluate_null_rate(dataset: &Dataset, ctx: &ValidationContext) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    for kind in DatasetKind::ALL {
        for gap in required_field_gaps(dataset, kind) {
            let missing = gap.missing.len();
            if missing == 0 || missing == gap.total {
                continue;
            }
            let rate = ratio(missing, gap.total);
            let severity = if rate >= ctx.thresholds.critical_null_rate {
                Severity::Critical
            } else {
                Severity::Warning
            };
            results.push(
                Finding::new(RuleId::NullRate, kind, severity, gap.total)
                    .field(gap.field)
                    .affected(gap.missing)
                    .describe(format!(
                        "{} is null in {missing} of {} {kind} records ({:.2}%)",
                        gap.field,
                        gap.total,
                        rate * 100.0
                    )),
            );
        }
    }
    results
}
