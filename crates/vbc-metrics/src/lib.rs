//! vbc-metrics
//!
//! Financial, quality, and risk metrics for one contract period, plus the
//! year-end prediction built on top of them. Every function here is pure;
//! re-running on the same input yields the same report.

pub mod error;
pub mod financial;
pub mod prediction;
pub mod quality;
pub mod risk;
pub mod settings;
pub mod stats;

use tracing::debug;
use vbc_core::Period;
use vbc_core::models::contract::ContractParams;
use vbc_core::models::dataset::Dataset;
use vbc_core::models::metrics::MetricsReport;

pub use error::MetricsError;
pub use settings::AnalysisSettings;

/// Compute the full metrics report for a validated dataset.
pub fn analyze(
    dataset: &Dataset,
    params: &ContractParams,
    period: &Period,
    settings: &AnalysisSettings,
) -> Result<MetricsReport, MetricsError> {
    params.validate()?;
    settings.check()?;

    let quality = quality::score(params, &dataset.quality_measures, period, settings);
    let financial = financial::calculate(params, dataset, period, quality.quality_gate_status)?;
    let risk = risk::stratify(dataset, &params.risk_cut_points, period)?;
    let monthly_spending = financial::monthly_spending(dataset, period);

    let predictions = prediction::predict(
        &prediction::PredictionInputs {
            params,
            period,
            financial: &financial,
            quality: &quality,
            risk: &risk,
            monthly_spending: &monthly_spending,
        },
        settings,
    );

    debug!(
        contract_id = %params.contract_id,
        %period,
        actual_spending = financial.actual_spending,
        composite = quality.composite_score,
        gate = quality.quality_gate_status.as_str(),
        "metrics computed"
    );

    Ok(MetricsReport {
        contract_id: params.contract_id.clone(),
        period: *period,
        financial,
        quality,
        risk,
        predictions,
    })
}
