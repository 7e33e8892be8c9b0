//! Spending, savings, and utilization for the performance period.

use vbc_core::Period;
use vbc_core::models::claim::{MedicalClaim, PharmacyClaim};
use vbc_core::models::contract::ContractParams;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::member::Member;
use vbc_core::models::metrics::{FinancialMetrics, QualityGateStatus, SharedSavingsStatus};

use crate::error::MetricsError;

/// Months in `1..=period.month` whose calendar month overlaps the member's
/// attribution window.
pub fn months_attributed(member: &Member, period: &Period) -> Result<u32, MetricsError> {
    let mut months = 0;
    for m in 1..=period.month {
        if member.attributed_between(period.month_start(m)?, period.month_end(m)?) {
            months += 1;
        }
    }
    Ok(months)
}

pub fn member_months(members: &[Member], period: &Period) -> Result<u64, MetricsError> {
    let mut total = 0u64;
    for member in members {
        total += u64::from(months_attributed(member, period)?);
    }
    Ok(total)
}

pub(crate) fn medical_in_period<'a>(
    claims: &'a [MedicalClaim],
    period: &'a Period,
) -> impl Iterator<Item = &'a MedicalClaim> + 'a {
    claims
        .iter()
        .filter(|c| c.service_date.is_some_and(|d| period.contains(d)))
}

pub(crate) fn pharmacy_in_period<'a>(
    claims: &'a [PharmacyClaim],
    period: &'a Period,
) -> impl Iterator<Item = &'a PharmacyClaim> + 'a {
    claims
        .iter()
        .filter(|c| c.fill_date.is_some_and(|d| period.contains(d)))
}

/// Medical plus pharmacy paid amounts for each elapsed month, January first.
pub fn monthly_spending(dataset: &Dataset, period: &Period) -> Vec<f64> {
    let mut months = vec![0.0; period.month as usize];
    let mut add = |date: jiff::civil::Date, amount: Option<f64>| {
        let slot = (date.month() - 1) as usize;
        if let Some(total) = months.get_mut(slot) {
            *total += amount.unwrap_or(0.0);
        }
    };
    for claim in medical_in_period(&dataset.medical_claims, period) {
        if let Some(date) = claim.service_date {
            add(date, claim.paid_amount);
        }
    }
    for claim in pharmacy_in_period(&dataset.pharmacy_claims, period) {
        if let Some(date) = claim.fill_date {
            add(date, claim.paid_amount);
        }
    }
    months
}

fn per_1000(count: u64, average_members: f64) -> f64 {
    if average_members > 0.0 {
        count as f64 / average_members * 1000.0
    } else {
        0.0
    }
}

/// Year-to-date financial performance. `gate` decides whether shared savings
/// are paid out, held provisionally, or suppressed.
pub fn calculate(
    params: &ContractParams,
    dataset: &Dataset,
    period: &Period,
    gate: QualityGateStatus,
) -> Result<FinancialMetrics, MetricsError> {
    params.validate()?;

    let member_months = member_months(&dataset.members, period)?;
    if member_months == 0 {
        return Err(MetricsError::ZeroMemberMonths { period: *period });
    }
    let average_members = member_months as f64 / f64::from(period.month);

    let medical: Vec<&MedicalClaim> = medical_in_period(&dataset.medical_claims, period).collect();
    let pharmacy: Vec<&PharmacyClaim> =
        pharmacy_in_period(&dataset.pharmacy_claims, period).collect();

    let medical_spending: f64 = medical.iter().filter_map(|c| c.paid_amount).sum();
    let pharmacy_spending: f64 = pharmacy.iter().filter_map(|c| c.paid_amount).sum();
    let actual_spending = medical_spending + pharmacy_spending;

    let baseline = params.baseline_spending;
    let total_savings = baseline - actual_spending;
    let savings_percentage = total_savings / baseline * 100.0;

    let would_be_share = total_savings * params.sharing_rate;
    let (shared_savings_amount, shared_savings_status, provisional_shared_savings) = match gate {
        QualityGateStatus::Eligible => (
            would_be_share,
            SharedSavingsStatus::Finalized,
            would_be_share,
        ),
        QualityGateStatus::Pending => (0.0, SharedSavingsStatus::Provisional, would_be_share),
        QualityGateStatus::AtRisk | QualityGateStatus::Ineligible => {
            (0.0, SharedSavingsStatus::Suppressed, 0.0)
        }
    };

    let baseline_pmpm = baseline / (average_members * 12.0);
    let total_admits = medical.iter().filter(|c| c.inpatient_admit).count() as u64;
    let total_er_visits = medical.iter().filter(|c| c.er_visit).count() as u64;
    let generic_fills = pharmacy.iter().filter(|c| c.generic).count();
    let generic_dispensing_rate = if pharmacy.is_empty() {
        0.0
    } else {
        generic_fills as f64 / pharmacy.len() as f64 * 100.0
    };

    Ok(FinancialMetrics {
        period: *period,
        baseline_spending: baseline,
        sharing_rate: params.sharing_rate,
        target_reduction_pct: params.target_reduction_pct,
        medical_spending,
        pharmacy_spending,
        actual_spending,
        total_savings,
        savings_percentage,
        shared_savings_amount,
        shared_savings_status,
        provisional_shared_savings,
        member_months,
        average_members,
        baseline_pmpm,
        actual_pmpm: actual_spending / member_months as f64,
        target_pmpm: baseline_pmpm * (1.0 - params.target_reduction_pct),
        total_admits,
        total_er_visits,
        admits_per_1000: per_1000(total_admits, average_members),
        er_visits_per_1000: per_1000(total_er_visits, average_members),
        generic_dispensing_rate,
    })
}
