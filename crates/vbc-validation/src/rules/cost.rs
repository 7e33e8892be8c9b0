//! Paid and allowed amounts that are negative or implausibly large.
//!
//! A handful of negative amounts is the signature of a stray sign in the
//! extract; those are flipped when their magnitude is plausible. Large
//! volumes of negatives look like reversals and are left alone.

use vbc_core::models::claim::{MedicalClaim, PharmacyClaim};
use vbc_core::models::dataset::{Dataset, DatasetKind, RecordRef};
use vbc_core::models::validation::{RemediationAction, RuleId, Severity, ValidationResult};

use crate::context::ValidationContext;
use crate::error::ValidationError;
use crate::record::{Finding, Keyed, ratio};

trait Amounts: Keyed {
    fn amounts_mut(&mut self) -> Vec<&mut f64>;
    fn amounts(&self) -> Vec<f64>;
}

impl Amounts for MedicalClaim {
    fn amounts(&self) -> Vec<f64> {
        self.paid_amount.into_iter().chain(self.allowed_amount).collect()
    }

    fn amounts_mut(&mut self) -> Vec<&mut f64> {
        self.paid_amount
            .as_mut()
            .into_iter()
            .chain(self.allowed_amount.as_mut())
            .collect()
    }
}

impl Amounts for PharmacyClaim {
    fn amounts(&self) -> Vec<f64> {
        self.paid_amount.into_iter().collect()
    }

    fn amounts_mut(&mut self) -> Vec<&mut f64> {
        self.paid_amount.as_mut().into_iter().collect()
    }
}

struct Scan {
    flagged: Vec<RecordRef>,
    negative_rows: usize,
    flippable_rows: usize,
}

fn scan<T: Amounts>(records: &[T], limit: f64) -> Scan {
    let mut scan = Scan {
        flagged: Vec::new(),
        negative_rows: 0,
        flippable_rows: 0,
    };
    for record in records {
        let amounts = record.amounts();
        let negative = amounts.iter().any(|a| *a < 0.0);
        let high = amounts.iter().any(|a| *a > limit);
        if negative {
            scan.negative_rows += 1;
            if amounts.iter().any(|a| *a < 0.0 && -a <= limit) {
                scan.flippable_rows += 1;
            }
        }
        if negative || high {
            scan.flagged.push(record.record_ref());
        }
    }
    scan
}

fn fixable(scan: &Scan, total: usize, ctx: &ValidationContext) -> bool {
    scan.flippable_rows > 0
        && ratio(scan.negative_rows, total) <= ctx.thresholds.negative_fix_max_rate
}

fn finding<T: Amounts>(records: &[T], ctx: &ValidationContext) -> Option<ValidationResult> {
    let limit = ctx.thresholds.high_cost_amount;
    let scan = scan(records, limit);
    if scan.flagged.is_empty() {
        return None;
    }
    let total = records.len();
    let fixable = fixable(&scan, total, ctx);
    let description = format!(
        "{} {} records have a negative amount or one above {limit:.2} ({} negative)",
        scan.flagged.len(),
        T::KIND,
        scan.negative_rows
    );
    Some(
        Finding::new(RuleId::CostAmount, T::KIND, Severity::Warning, total)
            .field("paid_amount")
            .affected(scan.flagged)
            .auto_fixable(fixable)
            .describe(description),
    )
}

pub fn evaluate(dataset: &Dataset, ctx: &ValidationContext) -> Vec<ValidationResult> {
    finding(&dataset.medical_claims, ctx)
        .into_iter()
        .chain(finding(&dataset.pharmacy_claims, ctx))
        .collect()
}

fn flip<T: Amounts>(records: &mut [T], ctx: &ValidationContext) -> Vec<RecordRef> {
    let limit = ctx.thresholds.high_cost_amount;
    if !fixable(&scan(records, limit), records.len(), ctx) {
        return Vec::new();
    }
    let mut fixed = Vec::new();
    for record in records.iter_mut() {
        let mut touched = false;
        for amount in record.amounts_mut() {
            if *amount < 0.0 && -*amount <= limit {
                *amount = -*amount;
                touched = true;
            }
        }
        if touched {
            fixed.push(record.record_ref());
        }
    }
    fixed
}

pub fn remediate(
    dataset: &mut Dataset,
    finding: &ValidationResult,
    ctx: &ValidationContext,
) -> Result<Option<RemediationAction>, ValidationError> {
    let fixed = match finding.dataset {
        DatasetKind::MedicalClaims => flip(&mut dataset.medical_claims, ctx),
        DatasetKind::PharmacyClaims => flip(&mut dataset.pharmacy_claims, ctx),
        _ => Vec::new(),
    };
    if fixed.is_empty() {
        return Ok(None);
    }
    Ok(Some(RemediationAction {
        rule: RuleId::CostAmount,
        dataset: finding.dataset,
        description: format!("flipped the sign of negative amounts on {} records", fixed.len()),
        records: fixed,
    }))
}
