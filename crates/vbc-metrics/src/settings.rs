use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// Analysis knobs that are policy rather than contract terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Points below threshold still treated as closable when no trend exists.
    pub at_risk_band: f64,
    /// Required share of measures with a reportable denominator, 0–1.
    pub min_completeness: f64,
    /// Seasonal spending uplift applied to December.
    pub december_uplift: f64,
    /// Monthly savings volatility, as a share of baseline/12, when history is too short.
    pub fallback_volatility: f64,
    pub confidence_z: f64,
    /// Standard deviation of the year-end composite, in points.
    pub quality_sigma: f64,
    pub strong_savings_pct: f64,
    pub er_visits_per_1000_limit: f64,
    pub high_risk_share_limit: f64,
    pub generic_rate_floor: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            at_risk_band: 5.0,
            min_completeness: 1.0,
            december_uplift: 0.10,
            fallback_volatility: 0.10,
            confidence_z: 1.96,
            quality_sigma: 5.0,
            strong_savings_pct: 5.0,
            er_visits_per_1000_limit: 400.0,
            high_risk_share_limit: 25.0,
            generic_rate_floor: 80.0,
        }
    }
}

impl AnalysisSettings {
    pub fn check(&self) -> Result<(), MetricsError> {
        let non_negative = [
            ("at_risk_band", self.at_risk_band),
            ("december_uplift", self.december_uplift),
            ("fallback_volatility", self.fallback_volatility),
            ("confidence_z", self.confidence_z),
            ("quality_sigma", self.quality_sigma),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(MetricsError::InvalidSetting { name, value });
            }
        }
        if !(0.0..=1.0).contains(&self.min_completeness) {
            return Err(MetricsError::InvalidSetting {
                name: "min_completeness",
                value: self.min_completeness,
            });
        }
        Ok(())
    }
}
