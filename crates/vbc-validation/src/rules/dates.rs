use jiff::Span;
use jiff::civil::Date;
use vbc_core::models::claim::{MedicalClaim, PharmacyClaim};
use vbc_core::models::dataset::{Dataset, DatasetKind, RecordRef};
use vbc_core::models::validation::{RemediationAction, RuleId, Severity, ValidationResult};

use crate::context::ValidationContext;
use crate::error::ValidationError;
use crate::record::{Finding, Keyed, ratio};

pub fn evaluate_service_after_paid(
    dataset: &Dataset,
    _ctx: &ValidationContext,
) -> Vec<ValidationResult> {
    let affected: Vec<_> = dataset
        .medical_claims
        .iter()
        .filter(|c| matches!((c.service_date, c.paid_date), (Some(s), Some(p)) if s > p))
        .map(Keyed::record_ref)
        .collect();

    if affected.is_empty() {
        return Vec::new();
    }
    let count = affected.len();
    vec![
        Finding::new(
            RuleId::ServiceAfterPaid,
            DatasetKind::MedicalClaims,
            Severity::Critical,
            dataset.medical_claims.len(),
        )
        .field("service_date")
        .affected(affected)
        .describe(format!("{count} medical claims were paid before their service date")),
    ]
}

/// Claims whose service or fill date can move forward in time past `as_of`.
trait Dated: Keyed {
    const FIELD: &'static str;

    fn date(&self) -> Option<Date>;

    /// Applies `corrected` if the record stays consistent with it.
    fn correct(&mut self, corrected: Date) -> bool;
}

impl Dated for MedicalClaim {
    const FIELD: &'static str = "service_date";

    fn date(&self) -> Option<Date> {
        self.service_date
    }

    fn correct(&mut self, corrected: Date) -> bool {
        if self.paid_date.is_some_and(|paid| corrected > paid) {
            return false;
        }
        self.service_date = Some(corrected);
        true
    }
}

impl Dated for PharmacyClaim {
    const FIELD: &'static str = "fill_date";

    fn date(&self) -> Option<Date> {
        self.fill_date
    }

    fn correct(&mut self, corrected: Date) -> bool {
        self.fill_date = Some(corrected);
        true
    }
}

/// Future-dated rows, and whether they look like a one-digit year typo.
fn future_rows<T: Dated>(records: &[T], ctx: &ValidationContext) -> (Vec<RecordRef>, bool) {
    let typo_year = ctx.as_of.year() + 1;
    let mut future = Vec::new();
    let mut next_year = 0usize;
    for record in records {
        if let Some(date) = record.date().filter(|d| *d > ctx.as_of) {
            if date.year() == typo_year {
                next_year += 1;
            }
            future.push(record.record_ref());
        }
    }
    let typo = !future.is_empty()
        && ratio(next_year, future.len()) >= ctx.thresholds.year_typo_min_share;
    (future, typo)
}

fn future_finding<T: Dated>(records: &[T], ctx: &ValidationContext) -> Option<ValidationResult> {
    let (future, typo) = future_rows(records, ctx);
    if future.is_empty() {
        return None;
    }
    let description = format!(
        "{} {} records have a {} after {}{}",
        future.len(),
        T::KIND,
        T::FIELD,
        ctx.as_of,
        if typo { " (year-digit typo pattern)" } else { "" }
    );
    Some(
        Finding::new(RuleId::FutureServiceDate, T::KIND, Severity::Critical, records.len())
            .field(T::FIELD)
            .affected(future)
            .auto_fixable(typo)
            .describe(description),
    )
}

pub fn evaluate_future_service_date(
    dataset: &Dataset,
    ctx: &ValidationContext,
) -> Vec<ValidationResult> {
    future_finding(&dataset.medical_claims, ctx)
        .into_iter()
        .chain(future_finding(&dataset.pharmacy_claims, ctx))
        .collect()
}

fn roll_back<T: Dated>(
    records: &mut [T],
    ctx: &ValidationContext,
) -> Result<Vec<RecordRef>, ValidationError> {
    if !future_rows(records, ctx).1 {
        return Ok(Vec::new());
    }
    let typo_year = ctx.as_of.year() + 1;
    let mut fixed = Vec::new();
    for record in records.iter_mut() {
        let Some(date) = record.date() else {
            continue;
        };
        if date <= ctx.as_of || date.year() != typo_year {
            continue;
        }
        let corrected = date.checked_sub(Span::new().years(1))?;
        if corrected <= ctx.as_of && record.correct(corrected) {
            fixed.push(record.record_ref());
        }
    }
    Ok(fixed)
}

pub fn remediate_future_service_date(
    dataset: &mut Dataset,
    finding: &ValidationResult,
    ctx: &ValidationContext,
) -> Result<Option<RemediationAction>, ValidationError> {
    let fixed = match finding.dataset {
        DatasetKind::MedicalClaims => roll_back(&mut dataset.medical_claims, ctx)?,
        DatasetKind::PharmacyClaims => roll_back(&mut dataset.pharmacy_claims, ctx)?,
        _ => Vec::new(),
    };
    if fixed.is_empty() {
        return Ok(None);
    }
    Ok(Some(RemediationAction {
        rule: RuleId::FutureServiceDate,
        dataset: finding.dataset,
        description: format!(
            "moved {} future {} dates back one year",
            fixed.len(),
            finding.dataset
        ),
        records: fixed,
    }))
}
