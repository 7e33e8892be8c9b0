//! Rows sharing a primary key.
//!
//! When duplicates are rare they are collapsed to one survivor per key. The
//! survivor is the copy with the smallest serialized form, so the outcome
//! does not depend on the order the source returned rows in.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use vbc_core::models::dataset::{Dataset, DatasetKind, RecordRef};
use vbc_core::models::validation::{RemediationAction, RuleId, Severity, ValidationResult};

use crate::context::ValidationContext;
use crate::error::ValidationError;
use crate::record::{Finding, Keyed, ratio};

/// Every copy beyond the first of each key, in input order.
fn surplus<T: Keyed>(records: &[T]) -> Vec<RecordRef> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| !seen.insert(r.key()))
        .map(Keyed::record_ref)
        .collect()
}

fn finding<T: Keyed>(records: &[T], ctx: &ValidationContext) -> Option<ValidationResult> {
    let extra = surplus(records);
    if extra.is_empty() {
        return None;
    }
    let total = records.len();
    let rate = ratio(extra.len(), total);
    let critical = rate >= ctx.thresholds.critical_duplicate_rate;
    let severity = if critical {
        Severity::Critical
    } else {
        Severity::Warning
    };
    let description = format!(
        "{} surplus copies among {total} {} records ({:.2}%)",
        extra.len(),
        T::KIND,
        rate * 100.0
    );
    Some(
        Finding::new(RuleId::Duplicates, T::KIND, severity, total)
            .affected(extra)
            .auto_fixable(!critical)
            .describe(description),
    )
}

pub fn evaluate(dataset: &Dataset, ctx: &ValidationContext) -> Vec<ValidationResult> {
    [
        finding(&dataset.members, ctx),
        finding(&dataset.medical_claims, ctx),
        finding(&dataset.pharmacy_claims, ctx),
        finding(&dataset.quality_measures, ctx),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Keeps one row per key and returns references to the dropped rows.
pub fn dedupe<T: Keyed + Serialize>(records: &mut Vec<T>) -> Result<Vec<RecordRef>, ValidationError> {
    let mut survivors: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let canonical = serde_json::to_string(record)?;
        survivors
            .entry(record.key())
            .and_modify(|best| {
                if canonical < best.0 {
                    *best = (canonical.clone(), index);
                }
            })
            .or_insert((canonical, index));
    }
    if survivors.len() == records.len() {
        return Ok(Vec::new());
    }

    let keep: HashSet<usize> = survivors.values().map(|(_, index)| *index).collect();
    let mut dropped = Vec::new();
    let mut index = 0;
    records.retain(|record| {
        let kept = keep.contains(&index);
        if !kept {
            dropped.push(record.record_ref());
        }
        index += 1;
        kept
    });
    Ok(dropped)
}

fn fix<T: Keyed + Serialize>(
    records: &mut Vec<T>,
    ctx: &ValidationContext,
) -> Result<Vec<RecordRef>, ValidationError> {
    let extra = surplus(records).len();
    if extra == 0 || ratio(extra, records.len()) >= ctx.thresholds.critical_duplicate_rate {
        return Ok(Vec::new());
    }
    dedupe(records)
}

pub fn remediate(
    dataset: &mut Dataset,
    finding: &ValidationResult,
    ctx: &ValidationContext,
) -> Result<Option<RemediationAction>, ValidationError> {
    let dropped = match finding.dataset {
        DatasetKind::Members => fix(&mut dataset.members, ctx)?,
        DatasetKind::MedicalClaims => fix(&mut dataset.medical_claims, ctx)?,
        DatasetKind::PharmacyClaims => fix(&mut dataset.pharmacy_claims, ctx)?,
        DatasetKind::QualityMeasures => fix(&mut dataset.quality_measures, ctx)?,
    };
    if dropped.is_empty() {
        return Ok(None);
    }
    Ok(Some(RemediationAction {
        rule: RuleId::Duplicates,
        dataset: finding.dataset,
        description: format!(
            "removed {} duplicate {} rows",
            dropped.len(),
            finding.dataset
        ),
        records: dropped,
    }))
}
