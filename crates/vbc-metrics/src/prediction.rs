//! Year-end projection, confidence bounds, and threshold-based insights.

use vbc_core::Period;
use vbc_core::models::contract::ContractParams;
use vbc_core::models::metrics::{
    FinancialMetrics, Insight, InsightCategory, InsightSeverity, Predictions, QualityGateStatus,
    QualityMetrics, RiskStratification,
};

use crate::settings::AnalysisSettings;
use crate::stats;

/// Relative spending weight of a calendar month.
fn seasonal_factor(month: i8, settings: &AnalysisSettings) -> f64 {
    if month == 12 {
        1.0 + settings.december_uplift
    } else {
        1.0
    }
}

pub struct PredictionInputs<'a> {
    pub params: &'a ContractParams,
    pub period: &'a Period,
    pub financial: &'a FinancialMetrics,
    pub quality: &'a QualityMetrics,
    pub risk: &'a RiskStratification,
    /// Spending per elapsed month, January first.
    pub monthly_spending: &'a [f64],
}

pub fn predict(inputs: &PredictionInputs<'_>, settings: &AnalysisSettings) -> Predictions {
    let PredictionInputs {
        params,
        period,
        financial,
        quality,
        risk,
        monthly_spending,
    } = inputs;
    let baseline = params.baseline_spending;

    let run_rate = financial.actual_pmpm * financial.average_members;
    let remaining_spend: f64 = (period.month + 1..=12)
        .map(|m| run_rate * seasonal_factor(m, settings))
        .sum();
    let projected_spending = financial.actual_spending + remaining_spend;
    let projected_savings = baseline - projected_spending;

    let monthly_budget = baseline / 12.0;
    let savings_history: Vec<f64> = monthly_spending
        .iter()
        .map(|spent| monthly_budget - spent)
        .collect();
    let sigma_monthly = stats::sample_std_dev(&savings_history)
        .unwrap_or(monthly_budget * settings.fallback_volatility);
    let sigma_total = sigma_monthly * f64::from(period.remaining_months()).sqrt();
    let margin = settings.confidence_z * sigma_total;

    let target_savings = baseline * params.target_reduction_pct;
    let projected_quality_score = quality
        .projected_year_end_score
        .unwrap_or(quality.composite_score);

    let (risks, opportunities) = insights(params, financial, quality, risk, settings);

    Predictions {
        current_month: period.month,
        projected_year_end_spending: projected_spending,
        projected_year_end_savings: projected_savings,
        projected_savings_percentage: projected_savings / baseline * 100.0,
        projected_shared_savings: projected_savings * params.sharing_rate,
        savings_lower_bound: projected_savings - margin,
        savings_upper_bound: projected_savings + margin,
        target_savings,
        probability_meeting_target: stats::probability_at_least(
            projected_savings,
            target_savings,
            sigma_total,
        ),
        probability_shared_savings: stats::probability_at_least(projected_savings, 0.0, sigma_total),
        probability_quality_gate: stats::probability_at_least(
            projected_quality_score,
            params.quality_threshold,
            settings.quality_sigma,
        ),
        projected_quality_score,
        risks,
        opportunities,
    }
}

fn insight(
    category: InsightCategory,
    severity: InsightSeverity,
    title: &str,
    description: String,
    impact: String,
) -> Insight {
    Insight {
        category,
        severity,
        title: title.to_string(),
        description,
        impact,
    }
}

/// Risks and opportunities, in that order.
pub fn insights(
    params: &ContractParams,
    financial: &FinancialMetrics,
    quality: &QualityMetrics,
    risk: &RiskStratification,
    settings: &AnalysisSettings,
) -> (Vec<Insight>, Vec<Insight>) {
    let mut risks = Vec::new();
    let mut opportunities = Vec::new();

    let savings_pct = financial.savings_percentage;
    if savings_pct < 0.0 {
        risks.push(insight(
            InsightCategory::Financial,
            InsightSeverity::High,
            "Spending over baseline",
            format!("Spending is {:.1}% over baseline", savings_pct.abs()),
            "No shared savings are earned while spending exceeds the benchmark".to_string(),
        ));
    } else if savings_pct > settings.strong_savings_pct {
        let amount = if financial.shared_savings_amount > 0.0 {
            financial.shared_savings_amount
        } else {
            financial.provisional_shared_savings
        };
        opportunities.push(insight(
            InsightCategory::Financial,
            InsightSeverity::Positive,
            "Strong savings performance",
            format!("Tracking {savings_pct:.1}% below baseline"),
            format!("Shared savings of ${amount:.0} at current performance"),
        ));
    }

    if financial.er_visits_per_1000 > settings.er_visits_per_1000_limit {
        risks.push(insight(
            InsightCategory::Utilization,
            InsightSeverity::Medium,
            "High ER utilization",
            format!(
                "ER visits at {:.0} per 1,000 members",
                financial.er_visits_per_1000
            ),
            "Avoidable ER use raises cost and signals gaps in primary care access".to_string(),
        ));
    }

    if quality.quality_gate_status == QualityGateStatus::Pending {
        risks.push(insight(
            InsightCategory::Quality,
            InsightSeverity::Medium,
            "Quality data incomplete",
            format!(
                "{:.0}% of measures have a reportable denominator",
                quality.reporting_completeness * 100.0
            ),
            "Shared savings are held until every measure category reports".to_string(),
        ));
    } else if quality.composite_score < params.quality_threshold {
        let shortfall = quality.shortfall();
        let (title, severity) = match quality.quality_gate_status {
            QualityGateStatus::Ineligible => ("Quality gate not met", InsightSeverity::High),
            _ if shortfall > settings.at_risk_band => {
                ("Quality gate at risk", InsightSeverity::High)
            }
            _ => ("Quality gate at risk", InsightSeverity::Medium),
        };
        risks.push(insight(
            InsightCategory::Quality,
            severity,
            title,
            format!(
                "Composite score of {:.1} is {shortfall:.1} points below the {:.1} threshold",
                quality.composite_score, params.quality_threshold
            ),
            "Shared savings are forfeited unless the threshold is met".to_string(),
        ));
    }

    if risk.high_risk_pct > settings.high_risk_share_limit {
        risks.push(insight(
            InsightCategory::Population,
            InsightSeverity::Medium,
            "High-risk population concentration",
            format!("{:.1}% of members are high-risk", risk.high_risk_pct),
            "A concentrated high-risk panel drives disproportionate spending".to_string(),
        ));
    }

    if financial.generic_dispensing_rate > 0.0
        && financial.generic_dispensing_rate < settings.generic_rate_floor
    {
        opportunities.push(insight(
            InsightCategory::Pharmacy,
            InsightSeverity::Low,
            "Generic dispensing below target",
            format!(
                "Generic dispensing rate is {:.1}%, below {:.0}%",
                financial.generic_dispensing_rate, settings.generic_rate_floor
            ),
            "Therapeutic substitution lowers pharmacy spend".to_string(),
        ));
    }

    (risks, opportunities)
}
