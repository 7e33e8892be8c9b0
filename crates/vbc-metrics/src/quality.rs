//! Composite quality scoring and the shared-savings quality gate.

use std::collections::{BTreeMap, BTreeSet};

use vbc_core::Period;
use vbc_core::models::contract::{CategoryWeights, ContractParams};
use vbc_core::models::metrics::{MeasureScore, QualityGateStatus, QualityMetrics};
use vbc_core::models::quality_measure::{MeasureCategory, QualityMeasure};

use crate::settings::AnalysisSettings;
use crate::stats;

/// Latest reported row per measure, as of `as_of`.
fn current_measures<'a>(measures: &'a [QualityMeasure], as_of: &Period) -> Vec<&'a QualityMeasure> {
    let mut latest: BTreeMap<&str, &QualityMeasure> = BTreeMap::new();
    for m in measures.iter().filter(|m| m.category.is_some() && m.period <= *as_of) {
        latest
            .entry(m.measure_id.as_str())
            .and_modify(|cur| {
                if m.period > cur.period {
                    *cur = m;
                }
            })
            .or_insert(m);
    }
    latest.into_values().collect()
}

/// Weighted mean of the category's performance rates; plain mean when every
/// weight is zero; 0 when nothing is reported.
fn category_score(measures: &[&QualityMeasure], category: MeasureCategory) -> f64 {
    let rated: Vec<(f64, f64)> = measures
        .iter()
        .filter(|m| m.category == Some(category))
        .filter_map(|m| m.performance_rate().map(|r| (r, m.weight)))
        .collect();
    if rated.is_empty() {
        return 0.0;
    }
    let weight_sum: f64 = rated.iter().map(|(_, w)| w).sum();
    if weight_sum > 0.0 {
        rated.iter().map(|(r, w)| r * w).sum::<f64>() / weight_sum
    } else {
        rated.iter().map(|(r, _)| r).sum::<f64>() / rated.len() as f64
    }
}

fn scores(measures: &[&QualityMeasure], weights: &CategoryWeights) -> ([f64; 4], f64) {
    let mut by_category = [0.0; 4];
    let mut composite = 0.0;
    for (slot, category) in MeasureCategory::ALL.iter().enumerate() {
        let score = category_score(measures, *category);
        by_category[slot] = score;
        composite += score * weights.get(*category);
    }
    (by_category, composite)
}

/// Composite for each reporting month of the performance year.
fn composite_history(
    measures: &[QualityMeasure],
    period: &Period,
    weights: &CategoryWeights,
) -> Vec<(f64, f64)> {
    let months: BTreeSet<Period> = measures
        .iter()
        .map(|m| m.period)
        .filter(|p| p.year == period.year && p <= period)
        .collect();
    months
        .into_iter()
        .map(|month| {
            let current = current_measures(measures, &month);
            (f64::from(month.month), scores(&current, weights).1)
        })
        .collect()
}

pub fn score(
    params: &ContractParams,
    measures: &[QualityMeasure],
    period: &Period,
    settings: &AnalysisSettings,
) -> QualityMetrics {
    let weights = &params.category_weights;
    let threshold = params.quality_threshold;
    let current = current_measures(measures, period);
    let ([preventive, chronic, coordination, experience], composite) = scores(&current, weights);

    let reportable = current.iter().filter(|m| m.eligible_denominator() > 0).count();
    let reporting_completeness = if current.is_empty() {
        0.0
    } else {
        reportable as f64 / current.len() as f64
    };
    let every_category_reported = MeasureCategory::ALL.iter().all(|c| {
        current
            .iter()
            .any(|m| m.category == Some(*c) && m.eligible_denominator() > 0)
    });

    let remaining = f64::from(period.remaining_months());
    let trend_per_month = stats::slope(&composite_history(measures, period, weights));
    let projected_year_end_score =
        trend_per_month.map(|slope| (composite + slope * remaining).clamp(0.0, 100.0));

    let quality_gate_status = if current.is_empty()
        || !every_category_reported
        || reporting_completeness < settings.min_completeness
    {
        QualityGateStatus::Pending
    } else if composite >= threshold {
        QualityGateStatus::Eligible
    } else {
        let closable = remaining > 0.0
            && match projected_year_end_score {
                Some(projected) => projected >= threshold,
                None => threshold - composite <= settings.at_risk_band,
            };
        if closable {
            QualityGateStatus::AtRisk
        } else {
            QualityGateStatus::Ineligible
        }
    };

    let measures = current
        .iter()
        .filter_map(|m| {
            Some(MeasureScore {
                measure_id: m.measure_id.clone(),
                category: m.category?,
                performance_rate: m.performance_rate(),
                benchmark: m.benchmark,
                weight: m.weight,
            })
        })
        .collect();

    QualityMetrics {
        composite_score: composite,
        quality_threshold: threshold,
        quality_gate_status,
        preventive_care_score: preventive,
        chronic_disease_score: chronic,
        care_coordination_score: coordination,
        patient_experience_score: experience,
        reporting_completeness,
        trend_per_month,
        projected_year_end_score,
        measures,
    }
}
